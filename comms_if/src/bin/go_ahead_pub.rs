//! Fleet coordinator stand-in, hands out go-ahead packets to each robot in turn.

use chrono::Utc;
use comms_if::{
    net::{MonitoredSocket, SocketOptions},
    proto::{Address, Body, Header, Packet, COORDINATOR_ID},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "go_ahead_pub")]
struct Opt {
    /// Endpoint to publish on, robots list this as their coordinator endpoint
    #[structopt(short, long, default_value = "tcp://*:5199")]
    endpoint: String,

    /// Team the go-ahead packets are sent for
    #[structopt(short, long, default_value = "1")]
    team: u16,

    /// Time between two go-ahead packets
    #[structopt(short, long, default_value = "1000")]
    period_ms: u64,

    /// IDs of the robots to hand the go-ahead to
    #[structopt(required = true)]
    robots: Vec<u16>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let ctx = zmq::Context::new();

    let socket = MonitoredSocket::new(
        &ctx,
        zmq::PUB,
        SocketOptions {
            bind: true,
            ..Default::default()
        },
        &[opt.endpoint.clone()]
    )?;

    println!("Go-ahead publisher open on {}", opt.endpoint);

    let mut msg_seq_id = 0;

    for robot_id in opt.robots.iter().cycle() {
        let packet = Packet {
            header: Header {
                dest: Address::Robot(*robot_id),
                sender_id: COORDINATOR_ID,
                sender_team: opt.team,
                seq: 1,
                msg_seq_id,
                last_id: 1,
                send_time_ms: Header::ms_into_minute(&Utc::now()),
            },
            body: Body::GoAhead,
        };

        match socket.send(packet.to_bytes(usize::MAX)?, 0) {
            Ok(_) => println!("Go-ahead sent to robot {}", robot_id),
            Err(e) => println!("Failed to send go-ahead to robot {}: {}", robot_id, e)
        }

        msg_seq_id += 1;

        std::thread::sleep(std::time::Duration::from_millis(opt.period_ms));
    }

    Ok(())
}

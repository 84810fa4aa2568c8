//! Bandwidth estimation test pair.
//!
//! `bwe-test send` offers a video track and adapts its bitrate to the
//! estimator. `bwe-test receive` answers and records what arrives. The two
//! processes signal each other over plain HTTP; experiment logs go to `log/`.

#![warn(rust_2018_idioms)]

mod config;
mod dump;
mod interceptor;
mod node;
mod peer;
mod receiver;
mod sender;

use std::io::Write;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::error;

use config::{
    DEFAULT_RECEIVE_ANSWER_ADDRESS, DEFAULT_RECEIVE_OFFER_ADDRESS, DEFAULT_SEND_ANSWER_ADDRESS,
    DEFAULT_SEND_OFFER_ADDRESS, NodeConfig,
};
use node::RunOutcome;

#[derive(Parser)]
#[command(name = "bwe-test")]
#[command(author = "Rain Liu <yliu@webrtc.rs>")]
#[command(version = "0.1.0")]
#[command(about = "Offerer/answerer pair for testing bandwidth estimation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Offer a video track and adapt its rate to the bandwidth estimate.
    Send(SendArgs),
    /// Answer an offer and record the received media.
    Receive(ReceiveArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Address this process's signaling server binds to.
    #[arg(short, long, default_value = DEFAULT_SEND_OFFER_ADDRESS)]
    offer: String,
    /// Address of the receiving process's signaling server.
    #[arg(short, long, default_value = DEFAULT_SEND_ANSWER_ADDRESS)]
    answer: String,
}

#[derive(Args, Debug)]
struct ReceiveArgs {
    /// Address of the sending process's signaling server.
    #[arg(short, long, default_value = DEFAULT_RECEIVE_OFFER_ADDRESS)]
    offer: String,
    /// Address this process's signaling server binds to.
    #[arg(short, long, default_value = DEFAULT_RECEIVE_ANSWER_ADDRESS)]
    answer: String,
}

impl Command {
    fn into_config(self) -> NodeConfig {
        match self {
            Command::Send(args) => NodeConfig::sender(args.offer, args.answer),
            Command::Receive(args) => NodeConfig::receiver(args.offer, args.answer),
        }
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger();

    let config = cli.command.into_config();
    let result = match config.role {
        signaling::Role::Offerer => sender::run(config).await,
        signaling::Role::Answerer => receiver::run(config).await,
    };

    match result {
        Ok(RunOutcome::Interrupted) | Ok(RunOutcome::ConnectionFailed) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

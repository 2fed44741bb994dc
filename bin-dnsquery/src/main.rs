use clap::Parser;
use std::net::SocketAddr;
use std::process;
use tracing_subscriber::EnvFilter;

use dns_client::lookup::resolve;
use dns_client::types::Config;
use dns_wire::protocol::types::RecordType;

// the doc comments for this struct turn into the CLI help text
#[derive(Parser)]
/// One-shot DNS lookup utility
///
/// Sends a single query to an upstream resolver, over UDP by default
/// or TCP with --tcp, and prints the decoded answer section.  Record
/// types it cannot decode, and responses that are not a single
/// question of class IN, are reported as errors.
struct Args {
    /// Domain name to resolve
    #[clap(value_parser)]
    domain: String,

    /// Query type to resolve
    #[clap(default_value_t = RecordType::A, value_parser)]
    qtype: RecordType,

    /// Upstream resolver in ip:port form
    #[clap(short, long, default_value = "1.1.1.1:53", value_parser)]
    server: SocketAddr,

    /// Query over TCP instead of UDP
    #[clap(long, action(clap::ArgAction::SetTrue))]
    tcp: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config {
        server: args.server,
        tcp: args.tcp,
    };

    println!(";; QUESTION");
    println!("{} IN {}", args.domain, args.qtype);

    match resolve(args.qtype, &args.domain, &config).await {
        Ok((answers, id)) => {
            println!("\n;; ANSWER (transaction id {id})");
            if answers.is_empty() {
                println!("; empty answer section");
            }
            for answer in &answers {
                println!("{answer}");
            }
        }
        Err(error) => {
            println!("\n;; ANSWER");
            println!("; {error}");
            process::exit(1);
        }
    }
}

use clap::Parser;
use std::net::SocketAddr;
use std::process;
use tracing_subscriber::EnvFilter;

use dns_client::pipeline::bulk_resolve_a;
use dns_client::pooled::bulk_resolve_a_pooled;
use dns_client::types::Config;

// the doc comments for this struct turn into the CLI help text
#[derive(Parser)]
/// Bulk A-record lookup utility
///
/// Resolves every given name against one upstream resolver and
/// prints one line per name.  By default all queries share a single
/// pipelined UDP socket, with timed-out queries retransmitted until
/// the whole batch is answered; --pooled switches to a small pool of
/// independent one-shot lookups instead.
struct Args {
    /// Domain names to resolve
    #[clap(value_parser, required = true)]
    names: Vec<String>,

    /// Upstream resolver in ip:port form
    #[clap(short, long, default_value = "1.1.1.1:53", value_parser)]
    server: SocketAddr,

    /// Use a worker pool of one-shot lookups instead of the
    /// pipelined engine
    #[clap(long, action(clap::ArgAction::SetTrue))]
    pooled: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config {
        server: args.server,
        tcp: false,
    };

    let results = if args.pooled {
        bulk_resolve_a_pooled(args.names, &config).await
    } else {
        match bulk_resolve_a(args.names, &config).await {
            Ok(results) => results,
            Err(error) => {
                eprintln!("{error}");
                process::exit(1);
            }
        }
    };

    let mut lines: Vec<_> = results.iter().collect();
    lines.sort_by(|a, b| a.0.cmp(b.0));

    for (name, answer) in lines {
        match &answer.error {
            None => {
                let ips: Vec<String> = answer.ips.iter().map(ToString::to_string).collect();
                println!("{name}\t{}", ips.join(" "));
            }
            Some(error) => println!("{name}\t; {error}"),
        }
    }
}

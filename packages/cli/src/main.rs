use clap::Parser;
use shellcache_cli::{execute, init_tracing, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    match execute(&cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

use excuse_portal_cli::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = jotpad_lib::run().await {
        log::error!("jotpad exited: {}", err);
        eprintln!("jotpad: {}", err);
        std::process::exit(1);
    }
}

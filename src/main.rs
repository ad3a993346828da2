use streamdal_provider::{init_logging, serve, StreamdalProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(StreamdalProvider::new()).await
}

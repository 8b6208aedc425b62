use std::env;
use std::sync::Arc;

use actix_web::{App, HttpServer};

use operations::ElectionOperations;
use store::FileStore;

mod ballots;
mod elections;
mod model;
mod operations;
mod paths;
mod store;
mod tally;
mod util;

const DATA_DIR: &str = "COUNCIL_VOTE_DATA_DIR";

#[actix_web::main]
async fn main() {
    env_logger::init();

    let data_dir = env::var(DATA_DIR).unwrap_or_else(|_| String::from("data"));
    let store: Arc<FileStore> = Arc::new(FileStore::new(data_dir));
    let ops = ElectionOperations::new(store);

    let app = move || {
        App::new()
            .data(ops.clone())
            .configure(paths::config::<ElectionOperations>)
    };
    HttpServer::new(app).bind(("127.0.0.1", 8080))
        .unwrap()
        .run()
        .await
        .expect("HTTP Server failed to run.");
}

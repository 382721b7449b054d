use std::{env, io, process, sync::Arc};

use log::info;

use model_server::{
    Dispatcher, Handlers, ModelServer, ServerConfig, ServerErr, ShutdownFlag, interrupt,
};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ServerConfig::from_args(env::args().skip(1)) {
        Ok(config) => config,
        Err(ServerErr::Usage(detail)) => {
            eprintln!("{detail}");
            eprintln!("usage: model_server <endpoint>");
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let shutdown = Arc::new(ShutdownFlag::new());
    let _listener = interrupt::listen(Arc::clone(&shutdown));

    let server = ModelServer::connect(&config, Dispatcher::new(Handlers::new())).await?;
    server.run(&shutdown).await?;

    info!("model server exited");
    Ok(())
}

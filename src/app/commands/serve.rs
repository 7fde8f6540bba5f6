use log::*;

use std::convert::TryInto;
use std::thread;

use actix_rt::System;
use actix_web::{middleware, web, App, HttpServer};

use crate::{
  error::*,
  app::*,
  db::DbService,
  services::config_services,
};

pub fn execute(config: AppConfig) -> Result<()> {
  let servers = config.get_array("servers")?
    .ok_or_else(|| Error::BadRequest("Missing list of servers".to_string()))?;

  let mut handles = Vec::with_capacity(servers.len());
  for server in servers.iter() {
    let server = server.clone().into_str()?;
    let cfg = config.clone();
    debug!("Spawn server: {}", server);
    handles.push(thread::spawn(move || {
      if let Err(err) = run_server(&cfg, &server) {
        error!("Error from server({}): {:?}", server, err);
      }
      debug!("run_server({}): stopped.", server);
    }));
  }

  for handle in handles {
    if handle.join().is_err() {
      error!("Server thread panicked.");
    }
  }

  info!("main thread: stopped.");
  Ok(())
}

async fn test_db(url: String) -> Result<()> {
  let db = DbService::new(&url);
  db.prepare().await
}

fn run_server(config: &AppConfig, prefix: &str) -> Result<()> {
  let mut sys = System::new(format!("system.{}", prefix));

  let debug = config.get_bool("debug")?.unwrap_or(false);
  debug!("Debug = {:?}", debug);

  let memory = config.get_bool("db.memory")?.unwrap_or(false);
  if debug && !memory {
    if let Some(db_url) = config.get_str("db.url")? {
      // Test db prepared statements.
      sys.block_on(test_db(db_url))?;
    }
  }

  // configure services
  info!("Serve.Services: configure services. prefix={}", prefix);
  let services = config_services(&config, prefix)?;

  let max_body = config.get_int("comment.max_content_len")?.unwrap_or(10_000) as usize;

  // Start http server
  let mut server = HttpServer::new(move || {
    // a comment body plus its json envelope.
    let json = web::JsonConfig::default().limit(max_body * 4 + 1024);

    App::new()
      .app_data(json)
      .wrap(middleware::Logger::default())
      .wrap(middleware::Compress::default())
      .configure(|web| services.web_config(web))
  });

  // workers
  let workers = match config.get_int(&format!("{}.workers", prefix))? {
    Some(workers) => workers.try_into()
      .map_err(|_| Error::BadRequest(format!("{}.workers must be > 0", prefix)))?,
    None => num_cpus::get(),
  };
  info!("Workers: {}", workers);
  server = server.workers(workers);

  // listen backlog
  if let Some(backlog) = config.get_int(&format!("{}.backlog", prefix))? {
    info!("Listen backlog: {}", backlog);
    server = server.backlog(backlog as i32);
  }

  // setup binds.
  let listen = config.get_str(&format!("{}.listen", prefix))?
    .ok_or_else(|| Error::BadRequest(format!("Missing {}.listen", prefix)))?;
  info!("{} services listening on: {}", prefix, listen);
  server = server.bind(listen)?;

  // run server future
  let res = sys.block_on(server.run());
  Ok(res?)
}

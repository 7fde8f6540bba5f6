use dotenv::dotenv;

use clap::{App, Arg};

use fast_comments::{app::*, error::*};

fn cli() -> App<'static> {
  App::new("fast-comments")
    .about("Threaded article comments over HTTP")
    .arg(Arg::new("config")
      .short('c')
      .long("config")
      .value_name("FILE")
      .help("Config file merged over conf/default")
      .takes_value(true))
    .subcommand(App::new("serve")
      .about("Run the configured servers (default)"))
    .subcommand(App::new("schema")
      .about("Print the Postgres schema"))
}

fn main() -> Result<()> {
  dotenv().ok();
  env_logger::init();

  let cli = cli().get_matches();

  match cli.subcommand_name() {
    Some("schema") => schema::execute()?,
    // default to 'serve' command.
    _ => {
      let config = AppConfig::new_clap(&cli)?;
      serve::execute(config)?
    },
  }
  log::info!("Main finished");
  Ok(())
}

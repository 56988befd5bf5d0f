// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use env_logger::Env;
use eyre::{Result, WrapErr};
use gb580::{util, Config, Watch, CATALOG_HEADING};
use std::{env, path::PathBuf};


/// Environment variable naming an optional JSON config file.
const CONFIG_VAR: &str = "GB580_CONFIG";


fn load_config() -> Result<Config> {
  match env::var_os(CONFIG_VAR) {
    Some(path) => {
      let path = PathBuf::from(path);
      Config::load(&path).wrap_err_with(|| {
                           format!("failed to load config from {}",
                                   path.display())
                         })
    }
    None => Ok(Config::default()),
  }
}

fn main() -> Result<()> {
  color_eyre::install()?;
  env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

  let track_id = env::args().nth(1)
                            .map(|arg| arg.parse::<u16>())
                            .transpose()
                            .wrap_err("track id must be a number")?;

  let config = load_config()?;
  let mut watch = Watch::open(&config).wrap_err_with(|| {
                                        format!("failed to open {}",
                                                config.port())
                                      })?;

  let model = watch.model()?;
  println!("{} ({})", model.product(), model.model());

  println!("{}", CATALOG_HEADING);
  for summary in watch.track_list()? {
    println!("{}", summary.catalog_line());
  }

  if let Some(id) = track_id {
    let track = watch.load_track(id)
                     .wrap_err_with(|| format!("failed to load track {}", id))?;
    let header = track.header();
    println!();
    println!("track {} started {}", id, header.start());
    println!("  distance {} m, duration {}",
             header.distance(),
             util::format_decisec(header.total_time()));
    for (number, lap) in track.laps().iter().enumerate() {
      println!("  lap {:02}: {} m in {} ({} points)",
               number + 1,
               lap.distance(),
               util::format_decisec(lap.lap_time()),
               track.lap_points(lap).len());
    }
    println!("  {} points", track.points().len());
  }

  Ok(())
}

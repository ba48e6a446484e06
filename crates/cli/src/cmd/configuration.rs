//! Implementation of the `roundsman configuration` command.
//!
//! Lists every setting that has a default, with its current value and
//! whether the configuration overrides it. Deferred values are shown as
//! `<deferred>` and never evaluated.

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use roundsman_lib::config::DefaultEntry;

use super::{Overrides, Session};
use crate::output::{OutputFormat, print_json};

/// Width of the key column.
const KEY_WIDTH: usize = 30;

#[derive(Serialize)]
struct ConfigurationOutput {
  defaults: Vec<DefaultEntry>,
}

pub fn cmd_configuration(overrides: &Overrides, output: OutputFormat) -> Result<()> {
  let session = Session::load(overrides, Vec::new())?;
  let defaults = session.store.defaults();

  if output.is_json() {
    return print_json(&ConfigurationOutput { defaults });
  }

  for entry in &defaults {
    let key = format!("{},", entry.key);
    if entry.overridden {
      println!(
        "set {:<width$} {} {}",
        key,
        entry.value,
        "(overridden)".if_supports_color(Stream::Stdout, |s| s.yellow()),
        width = KEY_WIDTH
      );
    } else {
      println!("set {:<width$} {}", key, entry.value, width = KEY_WIDTH);
    }
  }
  Ok(())
}

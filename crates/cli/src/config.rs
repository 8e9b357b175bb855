// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of SpaceBased.
//
// SpaceBased is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// SpaceBased is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with SpaceBased. If not, see <https://www.gnu.org/licenses/>.

//! Config loading and display

use anyhow::{Context, Result};
use clap::ValueEnum;
use spacebased::SpaceBasedConfig;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Toml,
    Json,
}

/// Explicit file plus env overrides, or the usual env/default layering
pub fn load(path: Option<&Path>) -> Result<SpaceBasedConfig> {
    match path {
        Some(path) => {
            let mut config = SpaceBasedConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }
        None => SpaceBasedConfig::from_env_or_default().context("Failed to load configuration"),
    }
}

pub fn show(config: &SpaceBasedConfig, format: Format) -> Result<()> {
    let rendered = match format {
        Format::Toml => toml::to_string_pretty(config).context("Failed to render TOML")?,
        Format::Json => serde_json::to_string_pretty(config).context("Failed to render JSON")?,
    };
    println!("{}", rendered);
    Ok(())
}

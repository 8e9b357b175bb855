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

//! SpaceBased CLI Tool
//!
//! ## Purpose
//! - `demo`: build a system, stock inventory, push orders through the
//!   pipeline and print the outcome (optionally failing a node)
//! - `config`: print the effective configuration after file and env layering

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod demo;

#[derive(Parser)]
#[command(name = "spacebased")]
#[command(about = "SpaceBased CLI - run the space-based order pipeline", long_about = None)]
struct Cli {
    /// Config file (.toml/.yaml); defaults to $SPACEBASED_CONFIG or built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the order/inventory demo
    Demo {
        /// Number of orders to place
        #[arg(short, long, default_value_t = 10)]
        orders: usize,

        /// Payment RNG seed (overrides config)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Fail this node after placing orders
        #[arg(long)]
        fail_node: Option<String>,

        /// Print the cluster snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = config::Format::Toml)]
        format: config::Format,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo {
            orders,
            seed,
            fail_node,
            json,
        } => {
            spacebased::tracing_setup::init_tracing()
                .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))?;
            demo::run(settings, orders, seed, fail_node.as_deref(), json).await
        }
        Commands::Config { format } => config::show(&settings, format),
    }
}

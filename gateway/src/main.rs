//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wyldlands_gateway::telnet::TelnetServer;
use wyldlands_server::auth::BcryptAuthenticator;
use wyldlands_server::config::{Arguments, Configuration};
use wyldlands_server::context::WorldContext;

#[tokio::main]
async fn main() {
    let arguments: Arguments = Parser::parse();

    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_target(false).init();

    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            debug!("loading environment variables from {env_file}");
            dotenv::from_filename(env_file).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }

    let config = Configuration::load(&arguments.config_file)
        .inspect_err(|error| eprintln!("configuration load error: {error}"))
        .expect("unable to load configuration file");

    info!("starting wyldlands gateway");
    let port = *config.listener.port.as_ref();

    // The bundled `BcryptAuthenticator` holds its credential table in
    // memory only; real deployments supply their own `Authenticator`.
    let context = WorldContext::open(config, Box::new(BcryptAuthenticator::new()))
        .inspect_err(|error| eprintln!("failed to open world: {error}"))
        .expect("unable to open world data file");
    let context = Arc::new(context);

    tokio::spawn(wyldlands_server::autosave::run(context.clone()));

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap_or_else(|error| panic!("failed to bind listener on port {port}: {error}"));

    info!("listening on port {port}");
    TelnetServer::new(context).run(listener).await;
}

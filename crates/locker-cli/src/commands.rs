//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use locker_controller::{
    LockController, PollOptions, PollOutcome, StatusReporter, wait_for_state,
};
use locker_core::{Bay, LockState, LockerConfig};
use locker_hardware::{AnyTransport, BoardOptions, SerialTransport, SimulatedBoard, list_ports};
use locker_network::{LockerServer, LockerService};
use locker_protocol::AnyCodec;
use tracing::info;

fn build_controller(config: &LockerConfig, simulate: bool) -> Arc<LockController<AnyTransport>> {
    let codec = AnyCodec::from_config(&config.protocol);

    let transport = if simulate {
        let (board, _handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
        AnyTransport::from(board)
    } else {
        AnyTransport::from(SerialTransport::new(config.serial.clone()))
    };

    Arc::new(LockController::new(transport, codec))
}

/// Run the TCP server until Ctrl-C.
pub async fn serve(config: &LockerConfig, simulate: bool) -> Result<()> {
    let controller = build_controller(config, simulate);
    info!(
        link = %controller.describe().await,
        framing = %config.protocol.framing,
        board_address = config.protocol.board_address,
        "Starting locker service"
    );

    let service = LockerService::new(StatusReporter::new(controller));
    let server = LockerServer::bind(config.server.clone(), service)
        .await
        .context("failed to start server")?;

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
        .context("server failed")?;

    info!("Locker service stopped");
    Ok(())
}

/// Open a bay, optionally waiting for its door to be shut.
pub async fn open(
    config: &LockerConfig,
    simulate: bool,
    bay: Bay,
    wait: Option<PollOptions>,
) -> Result<()> {
    let controller = build_controller(config, simulate);

    controller
        .open(bay)
        .await
        .with_context(|| format!("failed to open bay {bay}"))?;
    println!("Locker {bay} command sent.");

    let Some(options) = wait else {
        return Ok(());
    };

    println!("Waiting for bay {bay} to close...");
    let reporter = StatusReporter::new(controller);
    match wait_for_state(&reporter, bay, LockState::Locked, options).await {
        PollOutcome::Reached { attempts } => {
            println!("Bay {bay} closed (after {attempts} checks).");
            Ok(())
        }
        PollOutcome::TimedOut { last } => {
            bail!("bay {bay} did not close within {:?} (last state: {last})", options.timeout)
        }
    }
}

/// Print the state of one bay.
pub async fn status(config: &LockerConfig, simulate: bool, bay: Bay) -> Result<()> {
    let controller = build_controller(config, simulate);
    let state = controller.query_status(bay).await;
    println!("Bay {bay}: {state}");
    Ok(())
}

/// Print the state of every bay.
pub async fn status_all(config: &LockerConfig, simulate: bool) -> Result<()> {
    let controller = build_controller(config, simulate);
    println!("BAY    STATUS");
    for status in controller.query_all().await {
        println!("{:<6} {}", status.bay.as_u8(), status.state);
    }
    Ok(())
}

/// Print serial ports found on this machine.
pub fn ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found.");
        return;
    }
    for port in ports {
        println!("{port}");
    }
}

use crate::control::model::StatusModel;
use anyhow::{anyhow, Context, Result};
use serde_json::json;
use smurfcore::{ConfigError, ControlCommand, ProcessorConfig, SmurfProcessor};
use std::{
    net::SocketAddr,
    sync::{mpsc, Arc},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

type Reply = warp::reply::WithStatus<warp::reply::Json>;

fn outcome(result: Result<(), ConfigError>) -> Reply {
    match result {
        Ok(()) => warp::reply::with_status(warp::reply::json(&json!({"status": "ok"})), StatusCode::OK),
        Err(err) => warp::reply::with_status(
            warp::reply::json(&json!({"status": "rejected", "error": err.to_string()})),
            StatusCode::BAD_REQUEST,
        ),
    }
}

/// HTTP surface over the processor's getters and setters.
pub fn routes(
    processor: Arc<SmurfProcessor>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let processor_filter = warp::any().map(move || processor.clone());

    let get_config = warp::path("config")
        .and(warp::path::end())
        .and(warp::get())
        .and(processor_filter.clone())
        .map(|processor: Arc<SmurfProcessor>| warp::reply::json(&processor.config()));

    let put_config = warp::path("config")
        .and(warp::path::end())
        .and(warp::put())
        .and(warp::body::json())
        .and(processor_filter.clone())
        .map(|config: ProcessorConfig, processor: Arc<SmurfProcessor>| {
            outcome(processor.apply_config(&config))
        });

    let status = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(processor_filter.clone())
        .map(|processor: Arc<SmurfProcessor>| {
            warp::reply::json(&StatusModel::capture(&processor))
        });

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(processor_filter.clone())
        .map(|processor: Arc<SmurfProcessor>| warp::reply::json(&processor.metrics()));

    let command = warp::path("command")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(processor_filter)
        .map(|command: ControlCommand, processor: Arc<SmurfProcessor>| {
            outcome(command.apply(&processor))
        });

    get_config
        .or(put_config)
        .or(status)
        .or(metrics)
        .or(command)
}

/// Control endpoint served from its own thread for the life of the process.
pub struct ControlBridge {
    processor: Arc<SmurfProcessor>,
    address: SocketAddr,
}

impl ControlBridge {
    pub fn spawn(processor: Arc<SmurfProcessor>, bind: SocketAddr) -> Result<Self> {
        let routes = routes(processor.clone());
        let (bound_tx, bound_rx) = mpsc::channel();

        thread::Builder::new()
            .name("control-bridge".to_string())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = bound_tx.send(Err(anyhow!(err)));
                        return;
                    }
                };
                runtime.block_on(async move {
                    match warp::serve(routes).try_bind_ephemeral(bind) {
                        Ok((address, server)) => {
                            let _ = bound_tx.send(Ok(address));
                            server.await;
                        }
                        Err(err) => {
                            let _ = bound_tx.send(Err(anyhow!(err)));
                        }
                    }
                });
            })
            .context("spawning control bridge thread")?;

        let address = bound_rx
            .recv()
            .context("control bridge thread exited before binding")?
            .with_context(|| format!("binding control bridge to {}", bind))?;
        Ok(Self { processor, address })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn status(&self) -> StatusModel {
        StatusModel::capture(&self.processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::mpsc as std_mpsc;

    fn processor() -> Arc<SmurfProcessor> {
        let (tx, _rx) = std_mpsc::channel();
        Arc::new(SmurfProcessor::new(tx).unwrap())
    }

    #[tokio::test]
    async fn command_route_applies_and_rejects() {
        let processor = processor();
        let filter = routes(processor.clone());

        let ok = warp::test::request()
            .method("POST")
            .path("/command")
            .json(&ControlCommand::SetMask { mask: vec![1, 2, 3] })
            .reply(&filter)
            .await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(processor.num_ch(), 3);

        let rejected = warp::test::request()
            .method("POST")
            .path("/command")
            .json(&ControlCommand::SetFactor { factor: 0 })
            .reply(&filter)
            .await;
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(rejected.body()).unwrap();
        assert_eq!(body["status"], "rejected");

        let metrics = warp::test::request()
            .method("GET")
            .path("/metrics")
            .reply(&filter)
            .await;
        let counters: Value = serde_json::from_slice(metrics.body()).unwrap();
        assert_eq!(counters["received"], 0);
    }

    #[tokio::test]
    async fn config_routes_round_trip() {
        let processor = processor();
        let filter = routes(processor.clone());

        let mut config = processor.config();
        config.mask = vec![10, 20];
        config.filter.gain = 4.0;
        let put = warp::test::request()
            .method("PUT")
            .path("/config")
            .json(&config)
            .reply(&filter)
            .await;
        assert_eq!(put.status(), StatusCode::OK);

        let get = warp::test::request()
            .method("GET")
            .path("/config")
            .reply(&filter)
            .await;
        let served: ProcessorConfig = serde_json::from_slice(get.body()).unwrap();
        assert_eq!(served.mask, vec![10, 20]);
        assert_eq!(served.filter.gain, 4.0);
    }

    #[test]
    fn bridge_binds_and_reports_status() {
        let processor = processor();
        let bridge = ControlBridge::spawn(processor.clone(), ([127, 0, 0, 1], 0).into()).unwrap();
        assert_ne!(bridge.address().port(), 0);
        processor.set_mask(vec![0, 1]).unwrap();
        assert_eq!(bridge.status().num_ch, 2);
    }
}

use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter = register_counter!(
        "window_gate_requests_total",
        "Total number of rate-limited route requests"
    )
    .unwrap();
    pub static ref REJECTED_TOTAL: Counter = register_counter!(
        "window_gate_rejected_total",
        "Requests rejected with 429"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge = register_gauge!(
        "window_gate_tracked_clients",
        "Client windows currently held in memory"
    )
    .unwrap();
    pub static ref EVICTED_CLIENTS: Counter = register_counter!(
        "window_gate_evicted_clients_total",
        "Client windows removed by the sweeper"
    )
    .unwrap();
    pub static ref CHECK_LATENCY: Histogram = register_histogram!(
        "window_gate_check_latency_seconds",
        "Time spent deciding a single request"
    )
    .unwrap();
}

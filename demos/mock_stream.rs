//! Poll a backend and print rigid-body poses to stdout.
//!
//! Usage: cargo run --example mock_stream -- [backend] [key=value ...]
//! Defaults to the built-in mock backend with two rigid bodies.

use motioncapture::{Config, MocapError, Registry};
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let backend = args.next().unwrap_or_else(|| "mock".to_string());
    let mut config: Config = args
        .filter_map(|kv| kv.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
        .collect();
    if backend == "mock" && !config.contains_key("rigid_bodies") {
        config.insert("rigid_bodies", "robot1(1,2,3);cf2(0,0,1,0.7071,0,0,0.7071)");
        config.insert("markers", "0,0,0;0.1,0,0");
        config.insert("latency", "0.002");
    }

    println!("motioncapture {}", motioncapture::version());
    let registry = Registry::with_defaults();
    let mut session = match registry.connect(&backend, &config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };

    println!("Backend:      {}", session.backend_name());
    println!("Capabilities: {:?}", session.capabilities());
    println!();

    let start = Instant::now();
    let mut count: u64 = 0;
    let mut last_report = Instant::now();

    loop {
        match session.wait_for_next_frame().map(|_| ()) {
            Ok(()) => {
                count += 1;

                if count % 100 == 1 {
                    for (name, pose) in session.rigid_bodies() {
                        let p = pose.position();
                        let q = pose.rotation();
                        println!(
                            "ts={:<12}  {:<8} pos=[{:+.4}, {:+.4}, {:+.4}]  quat=[{:+.3}, {:+.3}, {:+.3}, {:+.3}]",
                            session.timestamp().as_micros(),
                            name,
                            p[0],
                            p[1],
                            p[2],
                            q.w,
                            q.x,
                            q.y,
                            q.z,
                        );
                    }
                    for latency in session.latency() {
                        println!(
                            "latency {}: {:.1} ms",
                            latency.name(),
                            latency.value() * 1e3
                        );
                    }
                    println!("markers: {}", session.point_cloud().len());
                }

                let now = Instant::now();
                if now.duration_since(last_report) >= Duration::from_secs(3) {
                    let elapsed = start.elapsed().as_secs_f64();
                    println!(
                        "--- {} frames in {:.1}s ({:.1} Hz) ---",
                        count,
                        elapsed,
                        count as f64 / elapsed
                    );
                    last_report = now;
                }
            }
            Err(e @ MocapError::ConnectionLost { .. }) => {
                eprintln!("Connection lost: {}", e);
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "\nTotal: {} frames in {:.1}s ({:.1} Hz)",
        count,
        elapsed,
        count as f64 / elapsed
    );
}

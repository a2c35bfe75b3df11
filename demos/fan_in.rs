// In demos/fan_in.rs
//
// Telemetry fan-in: several producer threads emit samples as fast as they can
// while one deliberately slow consumer aggregates them. The diode drops the
// oldest samples instead of slowing the producers down.
//
// cargo run --example fan_in -- <num_producers> [--auto-exit]
use diodes::DiodeBuilder;
use std::env;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Sample {
    source: usize,
    seq: u64,
    taken_at: Instant,
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <num_producers> [--auto-exit]", args[0]);
        std::process::exit(1);
    }

    let num_producers: usize = args[1].parse().expect("Invalid number of producers");
    let auto_exit = args.get(2).map(|s| s == "--auto-exit").unwrap_or(false);

    let lost = Arc::new(AtomicU64::new(0));
    let lost_for_alerter = Arc::clone(&lost);
    let (producer, mut consumer) = DiodeBuilder::new()
        .with_capacity(4096)
        .with_alerter(move |dropped: u64| {
            lost_for_alerter.fetch_add(dropped, Ordering::Relaxed);
        })
        .build::<Sample>()?;

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_for_handler = Arc::clone(&keep_running);

    // Handle Ctrl+C to stop the producers
    ctrlc::set_handler(move || {
        keep_running_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    println!("Fan-in: starting {} producers", num_producers);
    let mut handles = Vec::with_capacity(num_producers);
    for source in 0..num_producers {
        let producer = producer.clone();
        let keep_running = Arc::clone(&keep_running);
        handles.push(thread::spawn(move || {
            let mut seq = 0;
            while keep_running.load(Ordering::Relaxed) {
                producer.write(Sample {
                    source,
                    seq,
                    taken_at: Instant::now(),
                });
                seq += 1;
            }
            seq
        }));
    }
    drop(producer);

    if auto_exit {
        let keep_running = Arc::clone(&keep_running);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(2));
            keep_running.store(false, Ordering::SeqCst);
        });
    } else {
        println!("Press Ctrl+C to stop...");
    }

    let start = Instant::now();
    let mut received = 0u64;
    let mut last_seen = vec![0u64; num_producers];
    let mut worst_latency = Duration::ZERO;

    while consumer.has_producers() {
        let Some(sample) = consumer.try_read() else {
            thread::yield_now();
            continue;
        };
        received += 1;
        last_seen[sample.source] = sample.seq;
        worst_latency = worst_latency.max(sample.taken_at.elapsed());

        // A slow sink: pretend every 1000th sample needs a flush.
        if received % 1000 == 0 {
            thread::sleep(Duration::from_micros(200));
        }
        if received % 100_000 == 0 {
            println!(
                "Fan-in: {} received, {} dropped so far",
                received,
                lost.load(Ordering::Relaxed)
            );
        }
    }
    received += consumer.drain().count() as u64;

    let written: u64 = handles
        .into_iter()
        .map(|h| h.join().expect("producer thread panicked"))
        .sum();
    let elapsed = start.elapsed();
    let stats = consumer.stats();

    println!("Fan-in: ran for {:.2?}", elapsed);
    println!("Fan-in: {} written, {} received, {} dropped", written, received, stats.dropped);
    println!("Fan-in: {} write collisions", stats.collisions);
    println!("Fan-in: worst observed latency {:.2?}", worst_latency);
    println!(
        "Fan-in: producer throughput {:.2} million samples/sec",
        (written as f64 / elapsed.as_secs_f64()) / 1_000_000.0
    );
    println!("Fan-in: last sample per producer {:?}", last_seen);

    Ok(())
}

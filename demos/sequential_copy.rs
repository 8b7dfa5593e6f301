// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 AuraIO Contributors


//! Sequential file copy example
//!
//! Copies a file in batches: each batch issues several back-to-back reads
//! relative to the source cursor, waits for them in whatever order they
//! finish, then writes the chunks back-to-back relative to the destination
//! cursor. Cursor reservation keeps every chunk at the right offset.
//!
//! Usage: cargo run --example sequential_copy -- <source> <destination>

use aura_file::{Buffer, Engine, Result};
use std::cell::RefCell;
use std::env;
use std::fs::File;
use std::rc::Rc;
use std::time::Instant;

const CHUNK_SIZE: usize = 256 * 1024; // 256KB chunks
const BATCH: usize = 8;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <source> <destination>", args[0]);
        eprintln!("\nCopies a file with cursor-relative reads and writes.");
        std::process::exit(1);
    }

    let src_path = &args[1];
    let dst_path = &args[2];

    println!("aura-file Sequential Copy");
    println!("=========================");
    println!("Source:      {}", src_path);
    println!("Destination: {}", dst_path);

    let src_file = File::open(src_path)?;
    let file_size = src_file.metadata()?.len();
    let dst_file = File::create(dst_path)?;

    println!(
        "File size:   {} bytes ({:.2} MB)",
        file_size,
        file_size as f64 / (1024.0 * 1024.0)
    );

    let mut engine = Engine::new()?;
    println!("Backend:     {}", engine.backend_name());
    let src = engine.init_file(src_file)?;
    let dst = engine.init_file(dst_file)?;

    let buffers = (0..BATCH)
        .map(|_| Buffer::new(CHUNK_SIZE))
        .collect::<Result<Vec<_>>>()?;

    let start_time = Instant::now();
    println!("\nCopying...");

    let mut total_copied: u64 = 0;
    loop {
        // (chunk index, offset, bytes read) in completion order
        let done = Rc::new(RefCell::new(Vec::with_capacity(BATCH)));
        for (i, buf) in buffers.iter().enumerate() {
            let done = done.clone();
            unsafe {
                engine.read(src, &[buf.to_ref()], move |_, completion| {
                    let offset = completion.offset;
                    done.borrow_mut().push((i, offset, completion.result()));
                })
            }?;
        }
        engine.run()?;

        let mut chunks = done.take();
        chunks.sort_by_key(|&(_, offset, _)| offset);

        let mut batch_bytes = 0;
        for (i, offset, result) in chunks {
            let n = result?;
            if n == 0 {
                break;
            }
            let chunk = aura_file::BufferRef::from_slice(&buffers[i].as_slice()[..n]);
            unsafe {
                engine.write(dst, &[chunk], move |_, completion| {
                    if let Err(e) = completion.result() {
                        eprintln!("\nWrite at offset {} failed: {}", offset, e);
                        std::process::exit(1);
                    }
                })
            }?;
            batch_bytes += n as u64;
            if n < CHUNK_SIZE {
                break;
            }
        }
        engine.run()?;

        total_copied += batch_bytes;
        if file_size > 0 {
            let progress = 100.0 * total_copied as f64 / file_size as f64;
            eprint!("\rProgress: {:.1}%", progress);
        }
        if batch_bytes < (CHUNK_SIZE * BATCH) as u64 {
            break;
        }
    }

    engine.close(src, |_, _| {})?;
    engine.close(dst, |_, _| {})?;
    engine.run()?;

    let elapsed = start_time.elapsed().as_secs_f64();

    println!("\n\n=== Results ===");
    println!("Bytes copied: {}", total_copied);
    println!("Elapsed time: {:.3} seconds", elapsed);
    if elapsed > 0.0 {
        println!(
            "Throughput:   {:.2} MB/s",
            (total_copied as f64 / (1024.0 * 1024.0)) / elapsed
        );
    }

    let stats = engine.stats();
    println!("\nEngine statistics:");
    println!("  Ops completed:     {}", stats.ops_completed());
    println!("  Bytes transferred: {}", stats.bytes_transferred());
    println!("  Peak in-flight:    {}", stats.peak_in_flight());

    println!("\nDone! File copied successfully.");
    Ok(())
}

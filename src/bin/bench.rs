//! Benchmark for full constraint scoring throughput.
//!
//! Run with: cargo run --release --bin bench

use school_timetabling::constraints::define_constraints;
use school_timetabling::demo_data::{self, DemoData};
use std::time::Instant;

fn main() {
    let mut table = demo_data::generate(DemoData::Large);
    let n_lessons = table.lessons.len();
    let timeslot_ids: Vec<u64> = table.timeslots.iter().map(|t| t.id).collect();
    let room_ids: Vec<u64> = table.rooms.iter().map(|r| r.id).collect();

    // Round-robin start so every constraint has work to do.
    for (i, lesson) in table.lessons.iter_mut().enumerate() {
        lesson.timeslot_id = Some(timeslot_ids[i % timeslot_ids.len()]);
        lesson.room_id = Some(room_ids[i % room_ids.len()]);
    }

    println!("Benchmark: Full Scoring");
    println!("  Lessons: {}", n_lessons);
    println!("  Timeslots: {}", timeslot_ids.len());
    println!("  Rooms: {}", room_ids.len());
    println!();

    let constraints = define_constraints();

    let init_start = Instant::now();
    let initial_score = constraints.score(&table);
    println!("Initial score: {} ({:?})", initial_score, init_start.elapsed());
    println!();

    // Deterministic do/undo of a timeslot change for every lesson×timeslot pair
    let bench_start = Instant::now();
    let mut moves: u64 = 0;

    for lesson_idx in 0..n_lessons {
        let old_timeslot = table.lessons[lesson_idx].timeslot_id;

        for &timeslot_id in &timeslot_ids {
            table.lessons[lesson_idx].timeslot_id = Some(timeslot_id);
            let _ = constraints.score(&table);
            moves += 1;

            table.lessons[lesson_idx].timeslot_id = old_timeslot;
            let _ = constraints.score(&table);
            moves += 1;
        }
    }

    let elapsed = bench_start.elapsed();
    let moves_per_sec = moves as f64 / elapsed.as_secs_f64();

    println!("Results:");
    println!("  Moves: {}", moves);
    println!("  Time: {:.2?}", elapsed);
    println!("  Moves/sec: {:.0}", moves_per_sec);

    let final_score = constraints.score(&table);
    assert_eq!(initial_score, final_score, "Score corrupted!");
    println!("  Final score: {} (verified)", final_score);
}

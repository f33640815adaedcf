//! Performance benchmark for long-horizon recursive forecasts
//!
//! Run with: cargo bench --bench recursive_perf

use chrono::NaiveDate;
use revcast_core::{
    calibrate, forecast_recursive, BacktestOptions, DailySeries, FeatureWeight, ForecastOptions,
    HolidayCalendar, LinearModel, TransformPolicy,
};
use std::time::{Duration, Instant};

fn generate_weekly_series(n: usize) -> DailySeries {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = start.iter_days().take(n).collect();
    let values: Vec<Option<f64>> = (0..n)
        .map(|i| {
            let trend = 0.05 * i as f64;
            let weekly = 40.0 * (2.0 * std::f64::consts::PI * i as f64 / 7.0).sin();
            Some(500.0 + trend + weekly + (i % 5) as f64)
        })
        .collect();
    DailySeries::from_observations("daily_revenue_order", &dates, &values).unwrap()
}

fn model() -> LinearModel {
    let w = |feature: &str, weight: f64| FeatureWeight {
        feature: feature.to_string(),
        weight,
    };
    LinearModel::new(
        20.0,
        vec![
            w("lag_1", 0.3),
            w("lag_7", 0.4),
            w("lag_14", 0.1),
            w("roll_mean_7", 0.1),
            w("roll_mean_28", 0.05),
            w("weekday", 2.0),
            w("is_weekend", -15.0),
            w("is_holiday_window", 30.0),
            w("month", 0.5),
        ],
    )
}

fn benchmark_fn<F, R>(name: &str, iterations: usize, mut f: F) -> Duration
where
    F: FnMut() -> R,
{
    // Warmup
    let _ = f();

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = std::hint::black_box(f());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "{}: total={:?}, per_iter={:?}, iters={}",
        name, elapsed, per_iter, iterations
    );
    elapsed
}

fn main() {
    println!("=== Recursive Forecast Performance Benchmark ===\n");

    let series = generate_weekly_series(3 * 365);
    let model = model();
    let policy = TransformPolicy::identity();
    let holidays = HolidayCalendar::new(&["01-01", "05-01", "12-25"], 3);

    println!("--- 1. Recursive forecast by horizon ---\n");

    for &horizon in &[30usize, 90, 365, 1000] {
        let options = ForecastOptions {
            horizon,
            holidays: holidays.clone(),
            ..Default::default()
        };
        let iters = if horizon <= 365 { 100 } else { 10 };
        benchmark_fn(&format!("forecast_recursive(h={})", horizon), iters, || {
            forecast_recursive(&series, &model, &policy, &options)
        });
    }

    println!();

    println!("--- 2. History lookback ---\n");

    for &history_days in &[28usize, 365, 1000] {
        let options = ForecastOptions {
            horizon: 90,
            history_days,
            holidays: holidays.clone(),
            ..Default::default()
        };
        benchmark_fn(
            &format!("forecast_recursive(h=90, history={})", history_days),
            100,
            || forecast_recursive(&series, &model, &policy, &options),
        );
    }

    println!();

    println!("--- 3. Calibration backtest ---\n");

    for &days in &[60u64, 180, 365] {
        let options = BacktestOptions {
            holidays: holidays.clone(),
            ..BacktestOptions::trailing(&series, days).unwrap()
        };
        benchmark_fn(&format!("calibrate(trailing={})", days), 20, || {
            calibrate(&series, &model, &options)
        });
    }

    println!("\n=== Benchmark Complete ===");
}

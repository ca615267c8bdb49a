//! Property tests over the indicator library

use indicators::{bollinger, cvar, ema, macd, rsi, sma, value_at_risk};
use proptest::prelude::*;
use types::candle::Candle;

fn candles() -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec((1.0f64..10_000.0, 0.0f64..5.0, 0.0f64..1_000.0), 40..120).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (close, range, volume))| {
                Candle::new(i as i64 * 60, close, close + range, close - range, close, volume)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn rsi_is_bounded(series in candles(), period in 2usize..30) {
        let points = rsi(&series, period).unwrap();
        prop_assert_eq!(points.len(), series.len() - period);
        for point in points {
            prop_assert!((0.0..=100.0).contains(&point.value));
        }
    }

    #[test]
    fn sma_stays_inside_window(series in candles(), period in 1usize..30) {
        let points = sma(&series, period).unwrap();
        for (i, point) in points.iter().enumerate() {
            let window = &series[i..i + period];
            let lo = window.iter().map(|c| c.close).fold(f64::MAX, f64::min);
            let hi = window.iter().map(|c| c.close).fold(f64::MIN, f64::max);
            prop_assert!(point.value >= lo - 1e-9 && point.value <= hi + 1e-9);
            prop_assert_eq!(point.time, window[period - 1].time);
        }
    }

    #[test]
    fn ema_has_one_point_per_candle_after_seed(series in candles(), period in 1usize..30) {
        let points = ema(&series, period).unwrap();
        prop_assert_eq!(points.len(), series.len() - period + 1);
        prop_assert!(points.iter().all(|p| p.value.is_finite()));
    }

    #[test]
    fn bollinger_bands_are_ordered(series in candles(), period in 2usize..30, k in 0.1f64..4.0) {
        for band in bollinger(&series, period, k).unwrap() {
            prop_assert!(band.upper >= band.middle);
            prop_assert!(band.middle >= band.lower);
            prop_assert!(((band.upper - band.middle) - (band.middle - band.lower)).abs() <= 1e-9 * band.middle.abs().max(1.0));
        }
    }

    #[test]
    fn macd_histogram_is_line_minus_signal(series in candles()) {
        for point in macd(&series, 12, 26, 9).unwrap() {
            prop_assert!((point.histogram - (point.macd - point.signal)).abs() < 1e-9);
        }
    }

    #[test]
    fn cvar_is_at_least_var(
        returns in prop::collection::vec(-0.2f64..0.2, 1..200),
        confidence in 0.5f64..0.99,
    ) {
        let var = value_at_risk(&returns, confidence).unwrap();
        let es = cvar(&returns, confidence).unwrap();
        prop_assert!(es >= var - 1e-12);
    }
}

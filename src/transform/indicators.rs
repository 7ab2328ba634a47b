use crate::errors::{PipelineError, Result};
use ta::indicators::{
    ExponentialMovingAverage, MovingAverageConvergenceDivergence, RelativeStrengthIndex,
    SimpleMovingAverage,
};
use ta::Next;

pub const SMA_PERIOD: usize = 20;
pub const EMA_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// 指标列，与收盘价序列等长；预热期内为 NaN
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    pub sma_20: Vec<f64>,
    pub ema_50: Vec<f64>,
    pub rsi_14: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_histogram: Vec<f64>,
}

fn ta_error(name: &str, err: ta::errors::TaError) -> PipelineError {
    PipelineError::IndicatorError(format!("{name}: {err:?}"))
}

/// 逐点喂入指标，只喂有效收盘价；缺失行输出 NaN，
/// 前 `warmup` 个有效输入对应的输出也置为 NaN
fn run_indicator<I, O, F>(
    indicator: &mut I,
    closes: &[f64],
    warmup: usize,
    mut emit: F,
) where
    I: Next<f64, Output = O>,
    F: FnMut(usize, Option<O>),
{
    let mut seen = 0;
    for (i, &price) in closes.iter().enumerate() {
        if !price.is_finite() {
            emit(i, None);
            continue;
        }
        let value = indicator.next(price);
        seen += 1;
        emit(i, if seen > warmup { Some(value) } else { None });
    }
}

fn scalar_series<I>(indicator: &mut I, closes: &[f64], warmup: usize) -> Vec<f64>
where
    I: Next<f64, Output = f64>,
{
    let mut out = vec![f64::NAN; closes.len()];
    run_indicator(indicator, closes, warmup, |i, v| {
        if let Some(v) = v {
            out[i] = v;
        }
    });
    out
}

pub fn compute(closes: &[f64]) -> Result<IndicatorSeries> {
    let mut sma = SimpleMovingAverage::new(SMA_PERIOD).map_err(|e| ta_error("SMA", e))?;
    let mut ema = ExponentialMovingAverage::new(EMA_PERIOD).map_err(|e| ta_error("EMA", e))?;
    let mut rsi = RelativeStrengthIndex::new(RSI_PERIOD).map_err(|e| ta_error("RSI", e))?;
    let mut macd = MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
        .map_err(|e| ta_error("MACD", e))?;

    // RSI 需要一个差分，首个有效值在第 period 个输入
    let sma_20 = scalar_series(&mut sma, closes, SMA_PERIOD - 1);
    let ema_50 = scalar_series(&mut ema, closes, EMA_PERIOD - 1);
    let rsi_14 = scalar_series(&mut rsi, closes, RSI_PERIOD);

    let line_warmup = MACD_SLOW - 1;
    let signal_warmup = line_warmup + MACD_SIGNAL - 1;
    let mut series = IndicatorSeries {
        sma_20,
        ema_50,
        rsi_14,
        macd: vec![f64::NAN; closes.len()],
        macd_signal: vec![f64::NAN; closes.len()],
        macd_histogram: vec![f64::NAN; closes.len()],
    };

    // 主线和信号线预热长度不同，各自按有效输入计数
    let mut seen = 0;
    run_indicator(&mut macd, closes, 0, |i, out| {
        if let Some(out) = out {
            seen += 1;
            if seen > line_warmup {
                series.macd[i] = out.macd;
            }
            if seen > signal_warmup {
                series.macd_signal[i] = out.signal;
                series.macd_histogram[i] = out.histogram;
            }
        }
    });

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn short_history_is_all_warmup() {
        let series = compute(&ramp(10)).unwrap();
        assert_eq!(series.sma_20.len(), 10);
        assert!(series.sma_20.iter().all(|v| v.is_nan()));
        assert!(series.ema_50.iter().all(|v| v.is_nan()));
        assert!(series.rsi_14.iter().all(|v| v.is_nan()));
        assert!(series.macd.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn warmup_boundaries() {
        let series = compute(&ramp(60)).unwrap();

        assert!(series.sma_20[18].is_nan());
        assert!(series.sma_20[19].is_finite());
        assert!(series.ema_50[48].is_nan());
        assert!(series.ema_50[49].is_finite());
        assert!(series.rsi_14[13].is_nan());
        assert!(series.rsi_14[14].is_finite());
        assert!(series.macd[24].is_nan());
        assert!(series.macd[25].is_finite());
        assert!(series.macd_signal[32].is_nan());
        assert!(series.macd_signal[33].is_finite());
        assert!(series.macd_histogram[33].is_finite());
    }

    #[test]
    fn sma_matches_window_mean() {
        let closes = ramp(25);
        let series = compute(&closes).unwrap();
        let expected: f64 = closes[5..25].iter().sum::<f64>() / 20.0;
        assert!((series.sma_20[24] - expected).abs() < 1e-9);
    }

    #[test]
    fn gap_in_closes_does_not_poison_later_values() {
        let mut closes = ramp(120);
        closes[30] = f64::NAN;
        let series = compute(&closes).unwrap();

        assert!(series.sma_20[30].is_nan());
        assert!(series.macd[30].is_nan());
        assert!(series.sma_20[31].is_finite());
        for values in [
            &series.sma_20,
            &series.ema_50,
            &series.rsi_14,
            &series.macd,
            &series.macd_signal,
            &series.macd_histogram,
        ] {
            assert!(values[119].is_finite());
        }

        let expected: f64 = closes[100..120].iter().sum::<f64>() / 20.0;
        assert!((series.sma_20[119] - expected).abs() < 1e-9);
    }

    #[test]
    fn gap_during_warmup_delays_first_value() {
        let mut closes = ramp(30);
        closes[5] = f64::NAN;
        let series = compute(&closes).unwrap();
        assert!(series.sma_20[19].is_nan());
        assert!(series.sma_20[20].is_finite());
    }

    #[test]
    fn rising_prices_have_high_rsi_and_positive_macd() {
        let series = compute(&ramp(60)).unwrap();
        assert!(series.rsi_14[59] > 70.0);
        assert!(series.macd[59] > 0.0);
        let hist = series.macd[59] - series.macd_signal[59];
        assert!((series.macd_histogram[59] - hist).abs() < 1e-9);
    }
}

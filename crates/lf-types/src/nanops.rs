//! NaN-aware statistic kernels over an ordered cell sequence.
//!
//! Every kernel is a pure function. With `skipnan` set, non-numeric cells are
//! ignored; without it, any non-numeric cell turns the numeric result into
//! `Missing`.

use crate::Cell;

fn collect_numeric(values: &[Cell], skipnan: bool) -> Option<Vec<f64>> {
    let mut nums = Vec::with_capacity(values.len());
    for value in values {
        match value.as_f64() {
            Some(v) => nums.push(v),
            None if skipnan => {}
            None => return None,
        }
    }
    Some(nums)
}

pub fn nansum(values: &[Cell], skipnan: bool) -> Cell {
    match collect_numeric(values, skipnan) {
        Some(nums) => Cell::number(nums.iter().sum()),
        None => Cell::Missing,
    }
}

pub fn nanmean(values: &[Cell], skipnan: bool) -> Cell {
    match collect_numeric(values, skipnan) {
        Some(nums) if !nums.is_empty() => {
            Cell::number(nums.iter().sum::<f64>() / nums.len() as f64)
        }
        _ => Cell::Missing,
    }
}

/// Number of numeric cells, or the full length when NaN cells are kept.
pub fn nancount(values: &[Cell], skipnan: bool) -> Cell {
    let n = if skipnan {
        values.iter().filter(|v| v.is_numeric()).count()
    } else {
        values.len()
    };
    Cell::Number(n as f64)
}

pub fn nanmin(values: &[Cell], skipnan: bool) -> Cell {
    match collect_numeric(values, skipnan) {
        Some(nums) => nums
            .into_iter()
            .reduce(f64::min)
            .map_or(Cell::Missing, Cell::number),
        None => Cell::Missing,
    }
}

pub fn nanmax(values: &[Cell], skipnan: bool) -> Cell {
    match collect_numeric(values, skipnan) {
        Some(nums) => nums
            .into_iter()
            .reduce(f64::max)
            .map_or(Cell::Missing, Cell::number),
        None => Cell::Missing,
    }
}

pub fn nanvar(values: &[Cell], skipnan: bool, ddof: usize) -> Cell {
    let Some(nums) = collect_numeric(values, skipnan) else {
        return Cell::Missing;
    };
    if nums.len() <= ddof {
        return Cell::Missing;
    }
    let mean = nums.iter().sum::<f64>() / nums.len() as f64;
    let sum_sq: f64 = nums.iter().map(|x| (x - mean).powi(2)).sum();
    Cell::number(sum_sq / (nums.len() - ddof) as f64)
}

pub fn nanstd(values: &[Cell], skipnan: bool, ddof: usize) -> Cell {
    match nanvar(values, skipnan, ddof) {
        Cell::Number(v) => Cell::number(v.sqrt()),
        other => other,
    }
}

/// True when every considered cell is truthy (vacuously true when empty).
pub fn nanall(values: &[Cell], skipnan: bool) -> Cell {
    Cell::Bool(
        values
            .iter()
            .filter(|v| !skipnan || v.is_numeric())
            .all(Cell::is_truthy),
    )
}

pub fn nanany(values: &[Cell], skipnan: bool) -> Cell {
    Cell::Bool(
        values
            .iter()
            .filter(|v| !skipnan || v.is_numeric())
            .any(Cell::is_truthy),
    )
}

/// Maximum drawdown: the largest relative drop from a running peak, as a
/// non-negative fraction of that peak. Peaks at or below zero are skipped.
pub fn nanmdd(values: &[Cell], skipnan: bool) -> Cell {
    let Some(nums) = collect_numeric(values, skipnan) else {
        return Cell::Missing;
    };
    let mut iter = nums.into_iter();
    let Some(mut peak) = iter.next() else {
        return Cell::Missing;
    };
    let mut worst = 0.0_f64;
    for value in iter {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    Cell::number(worst)
}

/// First present value. With `skipnan` only numeric cells qualify; otherwise
/// any cell that is not NA does.
pub fn first(values: &[Cell], skipnan: bool) -> Cell {
    values
        .iter()
        .find(|v| if skipnan { v.is_numeric() } else { !v.is_na() })
        .cloned()
        .unwrap_or(Cell::Missing)
}

/// Position of the smallest numeric cell; ties resolve to the earliest.
pub fn idxmin(values: &[Cell]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (pos, value) in values.iter().enumerate() {
        let Some(v) = value.as_f64() else {
            continue;
        };
        match best {
            Some((_, current)) if current <= v => {}
            _ => best = Some((pos, v)),
        }
    }
    best.map(|(pos, _)| pos)
}

/// Running minimum. A non-numeric cell repeats the previous minimum
/// (`Missing` when it comes first).
pub fn cummin(values: &[Cell]) -> Vec<Cell> {
    let mut out: Vec<Cell> = Vec::with_capacity(values.len());
    for value in values {
        let previous = out.last();
        let next = match (value.as_f64(), previous.and_then(Cell::as_f64)) {
            (None, _) => previous.cloned().unwrap_or(Cell::Missing),
            (Some(v), Some(p)) if p < v => previous.cloned().unwrap_or(Cell::Missing),
            (Some(_), _) => value.clone(),
        };
        out.push(next);
    }
    out
}

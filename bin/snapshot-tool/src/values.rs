use anyhow::{anyhow, ensure, Context as _, Error as GenericError};

/// A single observation parsed from a values file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub value: f64,
    pub weight: f64,
}

/// Parses a values file.
///
/// Each line holds either a bare value, with an implied weight of one, or a `value,weight` pair. Blank lines and lines
/// starting with `#` are skipped.
pub fn parse_values(raw: &str) -> Result<Vec<Observation>, GenericError> {
    let mut observations = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let observation = parse_line(line).with_context(|| format!("Invalid observation on line {}.", index + 1))?;
        observations.push(observation);
    }

    Ok(observations)
}

fn parse_line(line: &str) -> Result<Observation, GenericError> {
    let (value, weight) = match line.split_once(',') {
        Some((value, weight)) => (value.trim(), Some(weight.trim())),
        None => (line, None),
    };

    let value = parse_finite(value, "value")?;
    let weight = match weight {
        Some(weight) => {
            let weight = parse_finite(weight, "weight")?;
            ensure!(weight > 0.0, "weight must be positive (got {})", weight);
            weight
        }
        None => 1.0,
    };

    Ok(Observation { value, weight })
}

fn parse_finite(raw: &str, what: &str) -> Result<f64, GenericError> {
    let parsed = raw
        .parse::<f64>()
        .map_err(|e| anyhow!("failed to parse {} '{}': {}", what, raw, e))?;
    ensure!(parsed.is_finite(), "{} must be finite (got {})", what, raw);
    Ok(parsed)
}

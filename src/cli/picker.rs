//! Interactive point picker for the manual elastic approximation.
//!
//! Renders the curve as an ASCII plot, then asks for two `strain stress`
//! pairs on the input stream. Invalid lines are re-prompted; `q` (or end of
//! input) cancels.

use std::io::{self, BufRead, Write};

use crate::domain::MergedCurve;
use crate::error::MechError;
use crate::fit::PointPicker;
use crate::plot::render_stress_strain;

pub struct StdinPointPicker<R = io::StdinLock<'static>, W = io::Stdout> {
    input: R,
    output: W,
    width: usize,
    height: usize,
}

impl StdinPointPicker {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_io(io::stdin().lock(), io::stdout(), width, height)
    }
}

impl<R: BufRead, W: Write> StdinPointPicker<R, W> {
    pub fn with_io(input: R, output: W, width: usize, height: usize) -> Self {
        Self {
            input,
            output,
            width,
            height,
        }
    }

    fn prompt_point(&mut self, label: &str) -> Result<(f64, f64), MechError> {
        loop {
            write!(self.output, "{label} as `strain stress` (q to cancel): ").map_err(io_error)?;
            self.output.flush().map_err(io_error)?;

            let mut line = String::new();
            let bytes = self.input.read_line(&mut line).map_err(io_error)?;
            if bytes == 0 {
                return Err(MechError::InvalidParameter("point selection canceled (no input)".into()));
            }
            match parse_point(&line) {
                Ok(Some(point)) => return Ok(point),
                Ok(None) => return Err(MechError::InvalidParameter("point selection canceled".into())),
                Err(msg) => writeln!(self.output, "{msg}").map_err(io_error)?,
            }
        }
    }
}

impl<R: BufRead, W: Write> PointPicker for StdinPointPicker<R, W> {
    fn pick(&mut self, curve: &MergedCurve) -> Result<[(f64, f64); 2], MechError> {
        let plot = render_stress_strain(curve, None, None, self.width, self.height);
        writeln!(self.output, "{plot}").map_err(io_error)?;
        writeln!(self.output, "Pick two points on the linear-elastic segment.").map_err(io_error)?;
        let first = self.prompt_point("Point 1")?;
        let second = self.prompt_point("Point 2")?;
        Ok([first, second])
    }
}

/// `Ok(None)` cancels.
fn parse_point(line: &str) -> Result<Option<(f64, f64)>, String> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Ok(None);
    }
    let parts: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    let [strain, stress] = parts.as_slice() else {
        return Err(format!("Expected two numbers, got '{line}'."));
    };
    let parse = |s: &str| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("Invalid number '{s}'."))
    };
    Ok(Some((parse(*strain)?, parse(*stress)?)))
}

fn io_error(e: io::Error) -> MechError {
    MechError::InvalidParameter(format!("terminal I/O failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> MergedCurve {
        MergedCurve::new(vec![0.0, 1.0, 2.0], vec![0.0, 1e-3, 2e-3], vec![0.0, 100.0, 150.0]).unwrap()
    }

    #[test]
    fn parses_whitespace_or_comma_pairs() {
        assert_eq!(parse_point(" 0.001 100\n"), Ok(Some((0.001, 100.0))));
        assert_eq!(parse_point("1e-3,  250.5"), Ok(Some((1e-3, 250.5))));
        assert_eq!(parse_point("Q"), Ok(None));
        assert!(parse_point("1 2 3").is_err());
        assert!(parse_point("x 2").is_err());
    }

    #[test]
    fn reprompts_until_two_points_are_read() {
        let input = "nonsense\n0.0005 50\n0.0015 120\n";
        let mut out = Vec::new();
        let picks = StdinPointPicker::with_io(input.as_bytes(), &mut out, 20, 6)
            .pick(&curve())
            .unwrap();
        assert_eq!(picks, [(0.0005, 50.0), (0.0015, 120.0)]);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Plot: strain="));
        assert!(text.contains("Expected two numbers"));
    }

    #[test]
    fn quit_or_eof_cancels() {
        let mut out = Vec::new();
        let err = StdinPointPicker::with_io("q\n".as_bytes(), &mut out, 20, 6)
            .pick(&curve())
            .unwrap_err();
        assert!(err.to_string().contains("canceled"));

        let err = StdinPointPicker::with_io("0.001 100\n".as_bytes(), Vec::new(), 20, 6)
            .pick(&curve())
            .unwrap_err();
        assert!(matches!(err, MechError::InvalidParameter(_)));
    }
}

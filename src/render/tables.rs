/// Indentation of every table row.
pub const ROW_INDENT: usize = 12;

/// Width of one table cell, not counting the separating space.
pub const CELL_WIDTH: usize = 11;

/// Significant digits of one table cell.
pub const CELL_PRECISION: usize = 5;

/// `n + 1` evenly spaced values from `b` to `e`, both included exactly.
pub fn frange(b: f64, e: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return vec![b];
    }

    let nf = n as f64;
    (0..=n)
        .map(|i| b * ((n - i) as f64 / nf) + e * (i as f64 / nf))
        .collect()
}

/// Formats like C's `%.<precision>g`: fixed or exponent notation, whichever is
/// shorter for the magnitude, without trailing zeros.
pub fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let p = precision.max(1);
    let sci = format!("{:.*e}", p - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if exp < -4 || exp >= p as i32 {
        format!(
            "{}e{}{:02}",
            strip_zeros(mantissa),
            if exp < 0 { '-' } else { '+' },
            exp.abs()
        )
    } else {
        let decimals = (p as i32 - 1 - exp) as usize;
        strip_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn cell(value: f64) -> String {
    format!(" {:>width$}", format_g(value, CELL_PRECISION), width = CELL_WIDTH)
}

/// One `argument value` line per row.
pub fn table1<F, E>(mut f: F, rows: &[f64]) -> Result<String, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let mut res = String::new();
    for &r in rows {
        res.push_str(&" ".repeat(ROW_INDENT));
        res.push_str(&cell(r));
        res.push_str(&cell(f(r)?));
        res.push('\n');
    }
    Ok(res)
}

/// Header line with the column arguments, then one line per row starting with the row argument.
pub fn table2<F, E>(mut f: F, rows: &[f64], cols: &[f64]) -> Result<String, E>
where
    F: FnMut(f64, f64) -> Result<f64, E>,
{
    let mut res = " ".repeat(ROW_INDENT + 1 + CELL_WIDTH);
    for &c in cols {
        res.push_str(&cell(c));
    }
    res.push('\n');

    for &r in rows {
        res.push_str(&" ".repeat(ROW_INDENT));
        res.push_str(&cell(r));
        for &c in cols {
            res.push_str(&cell(f(r, c)?));
        }
        res.push('\n');
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_frange() {
        assert_eq!(
            frange(0.0, 1.0, 10),
            vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]
        );
        assert_eq!(
            frange(0.0, 40000.0, 8),
            vec![0.0, 5000.0, 10000.0, 15000.0, 20000.0, 25000.0, 30000.0, 35000.0, 40000.0]
        );
        assert_eq!(frange(-0.3, 0.7, 3).first(), Some(&-0.3));
        assert_eq!(frange(-0.3, 0.7, 3).last(), Some(&0.7));
        assert_eq!(frange(2.0, 5.0, 0), vec![2.0]);
    }

    #[test]
    fn test_format_g() {
        let cases = [
            (0.0, "0"),
            (1.0, "1"),
            (0.1, "0.1"),
            (123456.0, "1.2346e+05"),
            (40000.0, "40000"),
            (0.00012345, "0.00012345"),
            (0.000012345, "1.2345e-05"),
            (1.0 / 3.0, "0.33333"),
            (-2.5, "-2.5"),
            (1e-300, "1e-300"),
            (2.0 / 3.0 * 1e5, "66667"),
            (5000.0, "5000"),
        ];

        for (v, expected) in cases {
            assert_eq!(format_g(v, 5), expected, "formatting {v}");
        }

        assert_eq!(format_g(f64::NAN, 5), "nan");
        assert_eq!(format_g(f64::NEG_INFINITY, 5), "-inf");
    }

    #[test]
    fn test_table1() {
        assert_eq!(
            table1(|r| Ok::<_, ()>(r * r), &[0.5, 2.0, 300.0]),
            Ok(concat!(
                "                     0.5        0.25\n",
                "                       2           4\n",
                "                     300       90000\n"
            )
            .to_string())
        );
    }

    #[test]
    fn test_table2() {
        assert_eq!(
            table2(
                |m, a| Ok::<_, ()>(m * a / 3.0),
                &[0.0, 0.5],
                &[0.0, 1000.0, 40000.0]
            ),
            Ok(concat!(
                "                                   0        1000       40000\n",
                "                       0           0           0           0\n",
                "                     0.5           0      166.67      6666.7\n"
            )
            .to_string())
        );
    }

    #[test]
    fn test_table_error() {
        let res = table2(
            |m, _| if m > 0.0 { Err("too fast") } else { Ok(1.0) },
            &[0.0, 1.0],
            &[0.0],
        );
        assert_eq!(res, Err("too fast"));
    }
}

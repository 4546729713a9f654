//! Physical units attached to axes and value channels.
//!
//! A [`Unit`] is a magnitude times a product of symbols raised to integer powers
//! (`2.5*mm`, `m/s`, `1/s`). Known symbols carry an SI scale and a base
//! dimension; unknown symbols (`px`, `frame`) are treated as their own dimension
//! with scale one.
//!
//! Grid axes and value channels only ever hold units of magnitude one: field
//! constructors call [`Unit::normalized`] and fold the magnitude into the numbers.
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Div, Mul};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const EXPONENT_EPS: f64 = 1e-9;

/// Scale to SI and base-dimension exponents of a known symbol.
fn known_symbol(symbol: &str) -> Option<(f64, &'static [(&'static str, i32)])> {
    const LENGTH: &[(&str, i32)] = &[("length", 1)];
    const TIME: &[(&str, i32)] = &[("time", 1)];
    const FREQUENCY: &[(&str, i32)] = &[("time", -1)];
    const MASS: &[(&str, i32)] = &[("mass", 1)];
    const ANGLE: &[(&str, i32)] = &[("angle", 1)];

    let entry = match symbol {
        "m" => (1.0, LENGTH),
        "km" => (1e3, LENGTH),
        "cm" => (1e-2, LENGTH),
        "mm" => (1e-3, LENGTH),
        "um" | "µm" => (1e-6, LENGTH),
        "nm" => (1e-9, LENGTH),
        "s" => (1.0, TIME),
        "ms" => (1e-3, TIME),
        "us" | "µs" => (1e-6, TIME),
        "min" => (60.0, TIME),
        "h" => (3600.0, TIME),
        "Hz" => (1.0, FREQUENCY),
        "kg" => (1.0, MASS),
        "g" => (1e-3, MASS),
        "rad" => (1.0, ANGLE),
        "deg" => (std::f64::consts::PI / 180.0, ANGLE),
        _ => return None,
    };
    Some(entry)
}

/// A physical unit: magnitude times a product of symbols with integer exponents.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    magnitude: f64,
    symbols: BTreeMap<String, i32>,
}

impl Unit {
    /// The dimensionless unit of magnitude one.
    pub fn dimensionless() -> Self {
        Self {
            magnitude: 1.0,
            symbols: BTreeMap::new(),
        }
    }

    /// Parses expressions such as `"mm/s"`, `"1/s"`, `"m^2"`, `"m**2/s"` or `"2.5*mm"`.
    ///
    /// Factors are applied left to right, so `"m/s*kg"` is `kg*m/s`. Whitespace
    /// between factors multiplies.
    pub fn parse(text: &str) -> Result<Self> {
        let normalized = text.trim().replace("**", "^");
        let mut unit = Unit::dimensionless();
        if normalized.is_empty() || normalized == "dimensionless" {
            return Ok(unit);
        }

        let mut sign = 1;
        let mut token = String::new();
        for ch in normalized.chars().chain(std::iter::once(' ')) {
            match ch {
                '*' | '/' => {
                    if !token.is_empty() {
                        unit.apply_factor(&token, sign, text)?;
                        token.clear();
                    }
                    sign = if ch == '/' { -1 } else { 1 };
                }
                c if c.is_whitespace() => {
                    if !token.is_empty() {
                        unit.apply_factor(&token, sign, text)?;
                        token.clear();
                        sign = 1;
                    }
                }
                c => token.push(c),
            }
        }
        Ok(unit)
    }

    fn apply_factor(&mut self, token: &str, sign: i32, source: &str) -> Result<()> {
        let (base, exponent) = match token.split_once('^') {
            Some((base, exp)) => {
                let exp: i32 = exp.parse().map_err(|_| {
                    Error::InvalidArgument(format!("bad exponent '{exp}' in unit '{source}'"))
                })?;
                (base, exp)
            }
            None => (token, 1),
        };
        let exponent = exponent * sign;

        if let Ok(number) = base.parse::<f64>() {
            if !number.is_finite() || number == 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "unit '{source}' has a non-finite or zero factor"
                )));
            }
            self.magnitude *= number.powi(exponent);
            return Ok(());
        }

        let valid_symbol = !base.is_empty()
            && base
                .chars()
                .all(|c| c.is_alphabetic() || c == '_' || c == 'µ');
        if !valid_symbol {
            return Err(Error::InvalidArgument(format!(
                "cannot parse '{base}' in unit '{source}'"
            )));
        }
        self.add_symbol(base, exponent);
        Ok(())
    }

    fn add_symbol(&mut self, symbol: &str, exponent: i32) {
        let entry = self.symbols.entry(symbol.to_string()).or_insert(0);
        *entry += exponent;
        if *entry == 0 {
            self.symbols.remove(symbol);
        }
    }

    /// Numeric prefactor of the unit (`2.5` for `2.5*mm`).
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Symbols and their exponents, sorted by symbol.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, i32)> {
        self.symbols.iter().map(|(s, e)| (s.as_str(), *e))
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension().is_empty()
    }

    /// Base-dimension exponents (`length`, `time`, `mass`, `angle`, or the symbol itself).
    pub fn dimension(&self) -> BTreeMap<String, i32> {
        let mut dims: BTreeMap<String, i32> = BTreeMap::new();
        for (symbol, exp) in &self.symbols {
            match known_symbol(symbol) {
                Some((_, base)) => {
                    for (name, e) in base {
                        *dims.entry((*name).to_string()).or_insert(0) += e * exp;
                    }
                }
                None => *dims.entry(symbol.clone()).or_insert(0) += exp,
            }
        }
        dims.retain(|_, e| *e != 0);
        dims
    }

    /// Factor converting one of this unit into SI base units.
    pub fn si_factor(&self) -> f64 {
        self.symbols.iter().fold(self.magnitude, |acc, (symbol, exp)| {
            let scale = known_symbol(symbol).map(|(s, _)| s).unwrap_or(1.0);
            acc * scale.powi(*exp)
        })
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension() == other.dimension()
    }

    /// Factor `f` such that `x [self] == x * f [to]`.
    pub fn conversion_factor(&self, to: &Unit) -> Result<f64> {
        if !self.is_compatible(to) {
            return Err(Error::incompatible_units(self, to));
        }
        Ok(self.si_factor() / to.si_factor())
    }

    /// Splits the unit into its magnitude and the same symbols with magnitude one.
    pub fn normalized(&self) -> (f64, Unit) {
        (
            self.magnitude,
            Unit {
                magnitude: 1.0,
                symbols: self.symbols.clone(),
            },
        )
    }

    pub fn is_normalized(&self) -> bool {
        self.magnitude == 1.0
    }

    pub fn powi(&self, n: i32) -> Unit {
        Unit {
            magnitude: self.magnitude.powi(n),
            symbols: self
                .symbols
                .iter()
                .filter(|_| n != 0)
                .map(|(s, e)| (s.clone(), e * n))
                .collect(),
        }
    }

    /// Raises to a real power; every resulting exponent must stay an integer.
    pub fn powf(&self, p: f64) -> Result<Unit> {
        let mut symbols = BTreeMap::new();
        for (symbol, exp) in &self.symbols {
            let raised = *exp as f64 * p;
            if (raised - raised.round()).abs() > EXPONENT_EPS {
                return Err(Error::incompatible_units(self, format!("({self})^{p}")));
            }
            let raised = raised.round() as i32;
            if raised != 0 {
                symbols.insert(symbol.clone(), raised);
            }
        }
        Ok(Unit {
            magnitude: self.magnitude.powf(p),
            symbols,
        })
    }

    pub fn recip(&self) -> Unit {
        self.powi(-1)
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::dimensionless()
    }
}

impl std::str::FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Unit::parse(s)
    }
}

impl Mul for &Unit {
    type Output = Unit;

    fn mul(self, rhs: &Unit) -> Unit {
        let mut out = self.clone();
        out.magnitude *= rhs.magnitude;
        for (symbol, exp) in &rhs.symbols {
            out.add_symbol(symbol, *exp);
        }
        out
    }
}

impl Div for &Unit {
    type Output = Unit;

    fn div(self, rhs: &Unit) -> Unit {
        self * &rhs.recip()
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        &self * &rhs
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        &self / &rhs
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = |symbol: &str, exp: i32| {
            if exp == 1 {
                symbol.to_string()
            } else {
                format!("{symbol}^{exp}")
            }
        };
        let numerator: Vec<String> = self
            .symbols
            .iter()
            .filter(|(_, e)| **e > 0)
            .map(|(s, e)| term(s, *e))
            .collect();
        let denominator: Vec<String> = self
            .symbols
            .iter()
            .filter(|(_, e)| **e < 0)
            .map(|(s, e)| term(s, -e))
            .collect();

        let mut out = String::new();
        if self.magnitude != 1.0 {
            out.push_str(&self.magnitude.to_string());
            if !numerator.is_empty() {
                out.push('*');
            }
        }
        if numerator.is_empty() && (self.magnitude == 1.0 || !denominator.is_empty()) {
            if self.magnitude == 1.0 {
                out.push('1');
            }
        } else {
            out.push_str(&numerator.join("*"));
        }
        for d in denominator {
            out.push('/');
            out.push_str(&d);
        }
        f.write_str(&out)
    }
}

/// A value carrying its unit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Expresses the quantity in another compatible unit.
    pub fn to(&self, unit: &Unit) -> Result<Quantity> {
        let factor = self.unit.conversion_factor(unit)?;
        Ok(Quantity::new(self.value * factor, unit.clone()))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(s: &str) -> Unit {
        Unit::parse(s).expect("unit parses")
    }

    #[test]
    fn parses_and_displays_compound_units() {
        assert_eq!(unit("m/s").to_string(), "m/s");
        assert_eq!(unit("1/s").to_string(), "1/s");
        assert_eq!(unit("m**2 / s").to_string(), "m^2/s");
        assert_eq!(unit("kg m s^-2").to_string(), "kg*m/s^2");
        assert_eq!(unit("").to_string(), "1");
    }

    #[test]
    fn factors_apply_left_to_right() {
        assert_eq!(unit("m/s*kg"), unit("kg*m/s"));
        assert_eq!(unit("m/s/s"), unit("m/s^2"));
    }

    #[test]
    fn magnitude_is_split_by_normalized() {
        let u = unit("2.5*mm");
        assert_eq!(u.magnitude(), 2.5);
        let (mag, norm) = u.normalized();
        assert_eq!(mag, 2.5);
        assert!(norm.is_normalized());
        assert_eq!(norm, unit("mm"));
    }

    #[test]
    fn conversion_between_compatible_units() {
        let f = unit("mm/s").conversion_factor(&unit("m/s")).unwrap();
        assert!((f - 1e-3).abs() < 1e-15);
        let f = unit("Hz").conversion_factor(&unit("1/s")).unwrap();
        assert!((f - 1.0).abs() < 1e-15);
    }

    #[test]
    fn conversion_between_incompatible_units_fails() {
        let err = unit("m").conversion_factor(&unit("s")).unwrap_err();
        assert!(matches!(err, Error::IncompatibleUnits { .. }));
    }

    #[test]
    fn unknown_symbols_are_their_own_dimension() {
        let px = unit("px");
        assert!(!px.is_compatible(&unit("m")));
        assert!(px.is_compatible(&unit("px")));
        assert_eq!(px.si_factor(), 1.0);
    }

    #[test]
    fn arithmetic_combines_symbols() {
        let velocity = unit("m/s");
        let length = unit("m");
        assert_eq!(&velocity / &length, unit("1/s"));
        assert_eq!(&velocity * &unit("s"), length);
        assert!((&length / &length).is_dimensionless());
    }

    #[test]
    fn powf_rejects_fractional_exponents() {
        assert_eq!(unit("m^2").powf(0.5).unwrap(), unit("m"));
        assert!(unit("m").powf(0.5).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Unit::parse("m^x").is_err());
        assert!(Unit::parse("m-s").is_err());
    }

    #[test]
    fn quantity_converts() {
        let q = Quantity::new(1500.0, unit("mm"));
        let m = q.to(&unit("m")).unwrap();
        assert!((m.value - 1.5).abs() < 1e-12);
        assert_eq!(m.to_string(), "1.5 m");
    }
}

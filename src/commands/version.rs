use crate::error::Result;
use crate::version::{Version, VersionConstraint};
use std::cmp::Ordering;

pub fn compare(a: &str, b: &str) -> Result<()> {
    let left = Version::parse(a)?;
    let right = Version::parse(b)?;
    let sign = match left.compare(&right) {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    println!("{} {} {}", left, sign, right);
    Ok(())
}

/// Returns whether `version` satisfies `constraint`.
pub fn satisfies(version: &str, constraint: &str) -> Result<bool> {
    let version = Version::parse(version)?;
    let constraint = VersionConstraint::parse(constraint)?;
    let ok = constraint.matches(&version);
    println!(
        "{} {} {}",
        version,
        if ok { "satisfies" } else { "does not satisfy" },
        constraint
    );
    Ok(ok)
}

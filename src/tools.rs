use time::OffsetDateTime;
use time::macros::format_description;
use super::constants::TWO_PI;
use super::errors::{DynamicsError, Result};
use super::particles::{Axes, Particle};

/// UTC time used to prefix INFO/WARNING/ERROR messages.
pub fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[year].[month].[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| String::from("????.??.?? ??:??:??"))
}

pub fn calculate_circular_velocity(gm: f64, distance: f64) -> f64 {
    (gm / distance).sqrt()
}

pub fn calculate_orbital_period(gm: f64, semimajor_axis: f64) -> f64 {
    TWO_PI * (semimajor_axis.powi(3) / gm).sqrt()
}

/// Vis-viva: semi-major axis of the relative orbit (negative if unbound).
pub fn calculate_semimajor_axis(gm: f64, position: Axes, velocity: Axes) -> f64 {
    let r = position.norm();
    let v2 = velocity.norm_squared();
    1. / (2. / r - v2 / gm)
}

pub fn calculate_eccentricity_vector(gm: f64, position: Axes, velocity: Axes) -> Axes {
    // Angular momentum per unit mass
    let h = position.cross(&velocity);
    let r = position.norm();
    velocity.cross(&h) / gm - position / r
}

/// Two bodies on a Keplerian orbit in the x-y plane, placed at apocenter and
/// expressed in their barycentric frame (zero total momentum).
pub fn calculate_two_body_orbit(gravitational_constant: f64, primary_mass: f64, secondary_mass: f64,
                                semimajor_axis: f64, eccentricity: f64) -> Result<Vec<Particle>> {
    if !(primary_mass > 0.) {
        return Err(DynamicsError::InvalidMass { index: 0, mass: primary_mass });
    }
    if !(secondary_mass > 0.) {
        return Err(DynamicsError::InvalidMass { index: 1, mass: secondary_mass });
    }
    if !(gravitational_constant > 0.) {
        return Err(DynamicsError::InvalidParameter { name: "gravitational_constant", value: gravitational_constant });
    }
    if !(semimajor_axis > 0.) {
        return Err(DynamicsError::InvalidParameter { name: "semimajor_axis", value: semimajor_axis });
    }
    if !(eccentricity >= 0. && eccentricity < 1.) {
        return Err(DynamicsError::InvalidParameter { name: "eccentricity", value: eccentricity });
    }

    let total_mass = primary_mass + secondary_mass;
    let gm = gravitational_constant * total_mass;
    let separation = semimajor_axis * (1. + eccentricity);
    let relative_velocity = (gm * (1. - eccentricity) / separation).sqrt();

    let primary = Particle::new(primary_mass,
                                Axes::new(-secondary_mass / total_mass * separation, 0., 0.),
                                Axes::new(0., -secondary_mass / total_mass * relative_velocity, 0.));
    let secondary = Particle::new(secondary_mass,
                                  Axes::new(primary_mass / total_mass * separation, 0., 0.),
                                  Axes::new(0., primary_mass / total_mass * relative_velocity, 0.));
    Ok(vec![primary, secondary])
}

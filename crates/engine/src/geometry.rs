//! Earth geometry on WGS84: distances between cartesian positions, conversion
//! to geodetic coordinates, and attitude from the wire's angle-axis form.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::{DQuat, DVec3, Vec3};

pub const METERS_PER_NM: f64 = 1852.0;
pub const METER_TO_FEET: f64 = 3.280_839_895_013_123_359_58;

const EQURAD: f64 = 6_378_137.0;
const SQUASH: f64 = 0.996_647_189_335_252_519_280_154_5;
const RA2: f64 = 1.0 / (EQURAD * EQURAD);
const E2: f64 = 1.0 - SQUASH * SQUASH;
const E4: f64 = E2 * E2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geod {
    /// Degrees, north positive.
    pub lat: f64,
    /// Degrees, east positive.
    pub lon: f64,
    pub alt_ft: f64,
}

/// Heading, pitch and roll in degrees. Heading is in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

#[inline]
pub fn distance_nm(a: DVec3, b: DVec3) -> f64 {
    a.distance(b) / METERS_PER_NM
}

/// Closed-form cartesian to geodetic conversion (Vermeille 2002).
pub fn cart_to_geod(cart: DVec3) -> Geod {
    let (x, y, z) = (cart.x, cart.y, cart.z);
    let xx_p_yy = x * x + y * y;
    if xx_p_yy + z * z < 25.0 {
        return Geod {
            lat: 0.0,
            lon: 0.0,
            alt_ft: -EQURAD * METER_TO_FEET,
        };
    }

    let sqrt_xx_p_yy = xx_p_yy.sqrt();
    let p = xx_p_yy * RA2;
    let q = z * z * (1.0 - E2) * RA2;
    let r = (p + q - E4) / 6.0;
    let mut s = E4 * p * q / (4.0 * r * r * r);
    // s*(2+s) goes negative on rounding noise in this range
    if (-2.0..=0.0).contains(&s) {
        s = 0.0;
    }
    let t = (1.0 + s + (s * (2.0 + s)).sqrt()).cbrt();
    let u = r * (1.0 + t + 1.0 / t);
    let v = (u * u + E4 * q).sqrt();
    let w = E2 * (u + v - q) / (2.0 * v);
    let k = (u + v + w * w).sqrt() - w;
    let d = k * sqrt_xx_p_yy / (k + E2);
    let sqrt_dd_p_zz = (d * d + z * z).sqrt();

    Geod {
        lat: (2.0 * z.atan2(d + sqrt_dd_p_zz)).to_degrees(),
        lon: (2.0 * y.atan2(x + sqrt_xx_p_yy)).to_degrees(),
        alt_ft: (k + E2 - 1.0) * sqrt_dd_p_zz / k * METER_TO_FEET,
    }
}

pub fn geod_to_cart(geod: Geod) -> DVec3 {
    let lambda = geod.lon.to_radians();
    let phi = geod.lat.to_radians();
    let h = geod.alt_ft / METER_TO_FEET;
    let sphi = phi.sin();
    let n = EQURAD / (1.0 - E2 * sphi * sphi).sqrt();
    let cphi = phi.cos();
    DVec3::new(
        (h + n) * cphi * lambda.cos(),
        (h + n) * cphi * lambda.sin(),
        (h + n - E2 * n) * sphi,
    )
}

/// Rotation from the earth-centred frame to the local horizontal frame.
pub fn earth_to_horizontal(lon_rad: f64, lat_rad: f64) -> DQuat {
    let zd2 = 0.5 * lon_rad;
    let yd2 = -FRAC_PI_4 - 0.5 * lat_rad;
    let (szd2, czd2) = zd2.sin_cos();
    let (syd2, cyd2) = yd2.sin_cos();
    DQuat::from_xyzw(-szd2 * syd2, czd2 * syd2, szd2 * cyd2, czd2 * cyd2)
}

/// Attitude of an aircraft at `lat`/`lon` (degrees) whose orientation is the
/// earth-centred angle-axis vector carried in position messages.
pub fn euler_get(lat: f64, lon: f64, orientation: Vec3) -> Attitude {
    let ec_orient = DQuat::from_scaled_axis(orientation.as_dvec3());
    let ec_to_hl = earth_to_horizontal(lon.to_radians(), lat.to_radians());
    let hl = ec_to_hl.conjugate() * ec_orient;
    let (heading, pitch, roll) = quat_to_euler(hl);
    Attitude {
        heading: heading.to_degrees(),
        pitch: pitch.to_degrees(),
        roll: roll.to_degrees(),
    }
}

/// Returns (z, y, x) rotations in radians, heading first.
fn quat_to_euler(q: DQuat) -> (f64, f64, f64) {
    let (w, x, y, z) = (q.w, q.x, q.y, q.z);
    let (ww, xx, yy, zz) = (w * w, x * x, y * y, z * z);

    let num = 2.0 * (y * z + w * x);
    let den = ww - xx - yy + zz;
    let roll = if den.abs() <= f64::MIN_POSITIVE && num.abs() <= f64::MIN_POSITIVE {
        0.0
    } else {
        num.atan2(den)
    };

    let tmp = 2.0 * (x * z - w * y);
    let pitch = if tmp <= -1.0 {
        FRAC_PI_2
    } else if tmp >= 1.0 {
        -FRAC_PI_2
    } else {
        -tmp.asin()
    };

    let num = 2.0 * (x * y + w * z);
    let den = ww + xx - yy - zz;
    let heading = if den.abs() <= f64::MIN_POSITIVE && num.abs() <= f64::MIN_POSITIVE {
        0.0
    } else {
        let psi = num.atan2(den);
        if psi < 0.0 { psi + 2.0 * PI } else { psi }
    };

    (heading, pitch, roll)
}

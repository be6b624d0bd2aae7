//! Black generation and CMY adjustment.

use super::options::DerivedScalars;

/// Per-pixel separation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Separation {
    pub c: i32,
    pub m: i32,
    pub y: i32,
    /// Black printed with black ink.
    pub bk: i32,
    /// Black value handed to the black channel as its adjusted input.
    pub k: i32,
}

/// Gray-component shaping for ink sets without black: pull every channel
/// towards the shared gray `k`, more strongly for darker channels.
pub(crate) fn update_cmy(c: i32, m: i32, y: i32, k: i32) -> Separation {
    let shape = |v: i32| -> i32 {
        let vk = (v - k) as i64;
        ((65535 - (v / 4) as i64) * vk / 65535) as i32 + k
    };
    Separation {
        c: shape(c),
        m: shape(m),
        y: shape(y),
        bk: 0,
        k,
    }
}

/// Gray-component replacement.
///
/// Black starts where the gray `k` (or the overall darkness of the pixel,
/// whichever is larger) passes the lower bound and is fully engaged at the
/// upper bound. The black amount is then removed from C, M and Y.
pub(crate) fn update_cmyk(s: &DerivedScalars, c: i32, m: i32, y: i32, k: i32) -> Separation {
    let ub = s.k_upper;
    let lb = s.k_lower;
    let density = s.density as i64;

    let kdarkness = 2 * c + 2 * m + y - s.density2;
    let ok = if kdarkness > 3 * k { kdarkness / 3 } else { k };

    let kl: i64 = if ok > lb {
        if s.dlb_range > 0 {
            (ok - lb) as i64 * density / s.dlb_range as i64
        } else {
            density
        }
    } else {
        0
    }
    .min(density);

    let ks: i64 = if k > ub {
        density
    } else if k < lb {
        0
    } else if s.bound_range > 0 {
        (k - lb) as i64 * density / s.bound_range as i64
    } else {
        0
    }
    .min(density);

    let ak = ks;
    let black = if density > 0 {
        (kl * ak / density).min(density)
    } else {
        0
    };

    let (mut c, mut m, mut y) = (c, m, y);
    if black > 0 && ak > 0 {
        let removed = (black * ak / density) as i32;
        c = (c - removed).max(0);
        m = (m - removed).max(0);
        y = (y - removed).max(0);
    }

    Separation {
        c,
        m,
        y,
        bk: black as i32,
        k: black as i32,
    }
}

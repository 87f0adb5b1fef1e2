#![allow(dead_code)]

// Pure derivation of capacity/credit/collateral from raw bilateral delta
// state. This is the single source of truth for "what can this
// account still settle" — nothing else in the workspace computes capacity
// by hand; `xln-account` and `xln-entity` both call through here.
//
// The bilateral state is a single signed number line:
//
//   [-leftCreditLimit ... 0 ... collateral ... collateral+rightCreditLimit]
//
// `raw = offdelta + ondelta` is the left-signed position on that line.
// Positive raw moves toward the right-credit end (left is owed, backed
// first by collateral then by the right's credit); negative raw moves
// toward the left-credit end (left is drawing on credit it extended to
// the right). An `addPayment` submitted by whichever side is the payer
// always pushes raw away from that side's own floor: left-submitted
// payments decrease raw, right-submitted payments increase it. Because
// `iAmLeft=false`'s whole view is a mirror of `iAmLeft=true`'s (own/peer,
// in/out, floor/ceiling all swap), every field below is computed once
// from the left's perspective and then either returned as-is or swapped.

use xln_base::Amount;

/// The bilateral ledger unit for one token within one account.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Delta {
    pub offdelta: Amount,
    pub collateral: Amount,
    pub ondelta: Amount,
    pub left_credit_limit: Amount,
    pub right_credit_limit: Amount,
}

impl Delta {
    pub fn zero() -> Self {
        Delta {
            offdelta: Amount::zero(),
            collateral: Amount::zero(),
            ondelta: Amount::zero(),
            left_credit_limit: Amount::zero(),
            right_credit_limit: Amount::zero(),
        }
    }
}

/// Output of [`derive_delta`]: the seven regions of the number line plus
/// the aggregate in/out capacities, all from the caller's own (`iAmLeft`)
/// point of view. All fields are non-negative except `delta`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Derived {
    pub delta: Amount,
    pub own_credit_limit: Amount,
    pub peer_credit_limit: Amount,
    pub in_own_credit: Amount,
    pub out_own_credit: Amount,
    pub in_collateral: Amount,
    pub out_collateral: Amount,
    pub in_peer_credit: Amount,
    pub out_peer_credit: Amount,
    pub in_capacity: Amount,
    pub out_capacity: Amount,
}

fn clamp(x: Amount, lo: Amount, hi: Amount) -> Amount {
    x.max(lo).min(hi)
}

/// Pure function; see module docs for the number-line model.
pub fn derive_delta(delta: &Delta, i_am_left: bool) -> Derived {
    let raw = &delta.offdelta + &delta.ondelta;
    let l = delta.left_credit_limit.clone();
    let c = delta.collateral.clone();
    let r = delta.right_credit_limit.clone();

    let in_own_credit = clamp(-&raw, Amount::zero(), l.clone());
    let out_own_credit = &l - &in_own_credit;
    let in_collateral = clamp(raw.clone(), Amount::zero(), c.clone());
    let out_collateral = &c - &in_collateral;
    let in_peer_credit = clamp(&raw - &c, Amount::zero(), r.clone());
    let out_peer_credit = &r - &in_peer_credit;

    // capacity_down == raw + l; capacity_up == c + r - raw (verified by
    // the property tests below), kept as region sums so the breakdown
    // and the aggregate can never silently disagree.
    let capacity_down = &(&out_own_credit + &in_collateral) + &in_peer_credit;
    let capacity_up = &(&in_own_credit + &out_collateral) + &out_peer_credit;

    if i_am_left {
        Derived {
            delta: raw,
            own_credit_limit: l,
            peer_credit_limit: r,
            in_own_credit,
            out_own_credit,
            in_collateral,
            out_collateral,
            in_peer_credit,
            out_peer_credit,
            in_capacity: capacity_up,
            out_capacity: capacity_down,
        }
    } else {
        Derived {
            delta: -raw,
            own_credit_limit: r,
            peer_credit_limit: l,
            in_own_credit: in_peer_credit,
            out_own_credit: out_peer_credit,
            in_collateral: out_collateral,
            out_collateral: in_collateral,
            in_peer_credit: in_own_credit,
            out_peer_credit: out_own_credit,
            in_capacity: capacity_down,
            out_capacity: capacity_up,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn delta(offdelta: i64, ondelta: i64, collateral: i64, l: i64, r: i64) -> Delta {
        Delta {
            offdelta: Amount::from(offdelta),
            ondelta: Amount::from(ondelta),
            collateral: Amount::from(collateral),
            left_credit_limit: Amount::from(l),
            right_credit_limit: Amount::from(r),
        }
    }

    #[test]
    fn zero_delta_splits_collateral_evenly_available() {
        let d = delta(0, 0, 200, 100, 100);
        let left = derive_delta(&d, true);
        assert_eq!(left.delta, Amount::zero());
        assert_eq!(left.in_collateral, Amount::zero());
        assert_eq!(left.out_collateral, Amount::from(200i64));
        assert_eq!(left.out_capacity, Amount::from(100i64)); // raw + L
        assert_eq!(left.in_capacity, Amount::from(300i64)); // C + R - raw
    }

    #[test]
    fn positive_delta_inside_peer_credit_region() {
        let d = delta(250, 0, 200, 100, 100);
        let left = derive_delta(&d, true);
        assert_eq!(left.in_collateral, Amount::from(200i64));
        assert_eq!(left.out_collateral, Amount::zero());
        assert_eq!(left.in_peer_credit, Amount::from(50i64));
        assert_eq!(left.out_peer_credit, Amount::from(50i64));
        assert_eq!(left.out_capacity, Amount::from(350i64));
        assert_eq!(left.in_capacity, Amount::from(50i64));
    }

    #[test]
    fn negative_delta_inside_own_credit_region() {
        let d = delta(-30, 0, 200, 100, 100);
        let left = derive_delta(&d, true);
        assert_eq!(left.in_own_credit, Amount::from(30i64));
        assert_eq!(left.out_own_credit, Amount::from(70i64));
        assert_eq!(left.out_capacity, Amount::from(70i64));
        assert_eq!(left.in_capacity, Amount::from(330i64));
    }

    #[test]
    fn derive_symmetry_holds_for_every_region() {
        // §8 invariant 5, generalized to the full capacity pair.
        for raw in [-90i64, -30, 0, 50, 199, 250, 349] {
            let d = delta(raw, 0, 200, 100, 100);
            let left = derive_delta(&d, true);
            let right = derive_delta(&d, false);
            assert_eq!(left.out_capacity, right.in_capacity);
            assert_eq!(left.in_capacity, right.out_capacity);
            assert_eq!(left.delta, -right.delta.clone());
        }
    }

    #[test]
    fn total_capacity_is_conserved() {
        let d = delta(77, 0, 200, 100, 100);
        let left = derive_delta(&d, true);
        let total = &left.in_capacity + &left.out_capacity;
        assert_eq!(total, Amount::from(400i64)); // L + C + R
    }
}

// `classifyBilateralState`: what the view layer calls to render
// an account's sync status. Part of the protocol, not just UI — the
// `should_rollback` flag is exactly the tie-break rule: only the right side
// of a colliding proposal ever rolls back.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BilateralState {
    Committed,
    PendingLocal,
    PendingRemote,
    Desynced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub state: BilateralState,
    pub should_rollback: bool,
}

/// `my_height`/`my_pending` describe this side's own `AccountMachine`;
/// `peer_known_height` is the last height this side has heard the peer
/// report (via gossip or a direct reply).
pub fn classify_bilateral_state(
    my_height: u64,
    my_pending: bool,
    peer_known_height: u64,
    i_am_left: bool,
) -> Classification {
    let diff = (my_height as i64 - peer_known_height as i64).abs();
    if diff > 1 {
        return Classification { state: BilateralState::Desynced, should_rollback: false };
    }

    if peer_known_height > my_height {
        // The peer has committed a height I haven't. If I also have a
        // pending proposal in flight at that same height, this tie is
        // resolved by always letting left win: only the right side rolls
        // back its own pending frame.
        let should_rollback = my_pending && !i_am_left;
        return Classification { state: BilateralState::PendingRemote, should_rollback };
    }

    if my_pending {
        return Classification { state: BilateralState::PendingLocal, should_rollback: false };
    }

    Classification { state: BilateralState::Committed, should_rollback: false }
}

use std::collections::{BTreeMap, VecDeque};

use simcore::{EntityId, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OrderKind {
    Chop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OrderState {
    Pending,
    Assigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Order {
    pub(crate) id: OrderId,
    pub(crate) kind: OrderKind,
    pub(crate) destination: EntityId,
    pub(crate) state: OrderState,
}

/// Work queue shared by every pawn. Pending orders are handed out
/// first-in first-out and each destination carries at most one order.
#[derive(Debug, Default)]
pub(crate) struct OrderSystem {
    next_order_id: u32,
    orders_by_id: BTreeMap<OrderId, Order>,
    pending: VecDeque<OrderId>,
}

impl OrderSystem {
    pub(crate) fn try_to_add_order(
        &mut self,
        kind: OrderKind,
        destination: EntityId,
    ) -> Option<OrderId> {
        if self
            .orders_by_id
            .values()
            .any(|order| order.destination == destination)
        {
            return None;
        }
        self.next_order_id = self.next_order_id.saturating_add(1);
        let id = OrderId(self.next_order_id);
        self.orders_by_id.insert(
            id,
            Order {
                id,
                kind,
                destination,
                state: OrderState::Pending,
            },
        );
        self.pending.push_back(id);
        Some(id)
    }

    pub(crate) fn get_pending_order_id(&self) -> Option<OrderId> {
        self.pending.front().copied()
    }

    pub(crate) fn set_order_assigned(&mut self, id: OrderId) {
        let order = self
            .orders_by_id
            .get_mut(&id)
            .unwrap_or_else(|| panic!("assigning unknown order {}", id.0));
        assert_eq!(order.state, OrderState::Pending, "order {} is already assigned", id.0);
        order.state = OrderState::Assigned;
        self.pending.retain(|pending| *pending != id);
    }

    /// Returns an assigned order to the back of the pending queue.
    pub(crate) fn release_order(&mut self, id: OrderId) {
        if let Some(order) = self.orders_by_id.get_mut(&id) {
            if order.state == OrderState::Assigned {
                order.state = OrderState::Pending;
                self.pending.push_back(id);
            }
        }
    }

    pub(crate) fn disband_order(&mut self, id: OrderId) -> Option<Order> {
        let order = self.orders_by_id.remove(&id)?;
        if order.state == OrderState::Pending {
            self.pending.retain(|pending| *pending != id);
        }
        Some(order)
    }

    pub(crate) fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders_by_id.get(&id)
    }

    pub(crate) fn orders_allocated(&self) -> usize {
        self.orders_by_id.len()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

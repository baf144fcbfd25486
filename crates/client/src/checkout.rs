//! Checkout flow on the client.
//!
//! Quote and submit calls can still be in flight when the shopper navigates
//! away. Each call is stamped with a [`Ticket`] carrying the flow generation;
//! leaving or re-entering checkout bumps the generation, and any result that
//! comes back with an older ticket is discarded without touching the cart or
//! the flow state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crumb_core::{CheckoutRequest, CustomerContact, DeliverySelection, PaymentMethod, PriceQuote};
use tracing::{debug, info};

use crate::api::{PlacedOrder, QuoteInput, StorefrontApi};
use crate::cart_store::{CartStorage, CartStore};
use crate::error::ClientError;

/// Proof that a call was started in a particular checkout visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Where the checkout screen is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// Not on the checkout screen.
    Closed,
    /// Collecting address and delivery details.
    Editing,
    Quoting,
    Quoted(PriceQuote),
    Submitting,
    /// The order was stored; the cart has been replaced with a fresh one.
    Placed(Box<PlacedOrder>),
    /// The last call failed; the shopper can retry.
    Failed(String),
}

/// Result of a guarded call.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The result belongs to the current visit and was applied.
    Applied(T),
    /// The shopper left before the result arrived.
    Discarded,
}

/// Details the shopper enters on the checkout screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub contact: CustomerContact,
    pub address: String,
    pub delivery: DeliverySelection,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
}

/// Checkout state shared between the UI and in-flight calls.
#[derive(Debug)]
pub struct CheckoutFlow {
    generation: AtomicU64,
    state: Mutex<FlowState>,
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutFlow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            state: Mutex::new(FlowState::Closed),
        }
    }

    /// Open the checkout screen. Results from earlier visits become stale.
    pub fn enter(&self) {
        self.restart(FlowState::Editing);
    }

    /// Leave the checkout screen. In-flight results will be discarded.
    pub fn leave(&self) {
        self.restart(FlowState::Closed);
        debug!("Left checkout");
    }

    /// Current screen state.
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stamp a new call, or `None` when checkout is not open.
    #[must_use]
    pub fn ticket(&self) -> Option<Ticket> {
        if self.state() == FlowState::Closed {
            return None;
        }
        Some(Ticket(self.generation.load(Ordering::SeqCst)))
    }

    /// Whether `ticket` still belongs to the current visit.
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation.load(Ordering::SeqCst)
    }

    /// Bump the generation and reset the state under one lock, so a settling
    /// call sees either the old visit or the new one.
    fn restart(&self, state: FlowState) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *guard = state;
    }

    /// Apply `state` only if `ticket` is current.
    fn settle(&self, ticket: Ticket, state: FlowState) -> bool {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(ticket) {
            return false;
        }
        *guard = state;
        true
    }

    /// Ask for a delivery quote for the cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the call fails while checkout is still open;
    /// the state becomes `Failed`.
    pub async fn request_quote(
        &self,
        api: &StorefrontApi,
        input: &QuoteInput,
    ) -> Result<Outcome<PriceQuote>, ClientError> {
        let Some(ticket) = self.ticket() else {
            return Ok(Outcome::Discarded);
        };
        self.settle(ticket, FlowState::Quoting);

        let result = api.quote(input).await;

        match result {
            Ok(quote) => {
                if self.settle(ticket, FlowState::Quoted(quote)) {
                    Ok(Outcome::Applied(quote))
                } else {
                    debug!("Discarding late quote");
                    Ok(Outcome::Discarded)
                }
            }
            Err(err) => {
                if self.settle(ticket, FlowState::Failed(err.to_string())) {
                    Err(err)
                } else {
                    Ok(Outcome::Discarded)
                }
            }
        }
    }

    /// Submit the cart as an order.
    ///
    /// On success the cart is replaced with a fresh empty one. If the
    /// shopper left before the reply arrived, neither the cart nor the flow
    /// state is touched.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 422 for an empty cart or bad
    /// details, other `ClientError`s for transport failures. The cart is kept.
    pub async fn submit<S: CartStorage>(
        &self,
        api: &StorefrontApi,
        cart: &mut CartStore<S>,
        details: CheckoutDetails,
    ) -> Result<Outcome<PlacedOrder>, ClientError> {
        let Some(ticket) = self.ticket() else {
            return Ok(Outcome::Discarded);
        };

        let request = CheckoutRequest {
            cart_id: Some(cart.cart().id()),
            lines: cart.cart().checkout_lines(),
            contact: details.contact,
            address: details.address,
            delivery: details.delivery,
            payment_method: details.payment_method,
            note: details.note,
        };
        self.settle(ticket, FlowState::Submitting);

        match api.place_order(&request).await {
            Ok(placed) => {
                if !self.settle(ticket, FlowState::Placed(Box::new(placed.clone()))) {
                    debug!("Discarding late order confirmation");
                    return Ok(Outcome::Discarded);
                }
                info!(order_id = %placed.order.id, "Order placed");
                cart.clear()?;
                Ok(Outcome::Applied(placed))
            }
            Err(err) => {
                if self.settle(ticket, FlowState::Failed(err.to_string())) {
                    Err(err)
                } else {
                    Ok(Outcome::Discarded)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_go_stale_on_leave() {
        let flow = CheckoutFlow::new();
        assert!(flow.ticket().is_none());

        flow.enter();
        let ticket = flow.ticket();
        assert!(ticket.is_some_and(|t| flow.is_current(t)));

        flow.leave();
        assert!(ticket.is_some_and(|t| !flow.is_current(t)));
        assert_eq!(flow.state(), FlowState::Closed);
    }

    #[test]
    fn test_reentering_invalidates_previous_visit() {
        let flow = CheckoutFlow::new();
        flow.enter();
        let first = flow.ticket();
        flow.enter();
        let second = flow.ticket();

        assert_ne!(first, second);
        assert!(first.is_some_and(|t| !flow.settle(t, FlowState::Submitting)));
        assert_eq!(flow.state(), FlowState::Editing);
    }
}

//! # Order Request Transitions
//!
//! ```text
//!              submit()
//!                 │
//!                 ▼
//!           ┌──────────┐   approve()   ┌──────────┐
//!           │ Pending  │──────────────►│ Approved │  (spawns an Order)
//!           └────┬─────┘               └──────────┘
//!                │ reject()            ┌──────────┐
//!                └────────────────────►│ Rejected │
//!                                      └──────────┘
//! ```
//!
//! Both outcomes are terminal. Deciding twice is a conflict.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{OrderLine, OrderRequest, RequestStatus};
use crate::validation::validate_lines;

impl OrderRequest {
    /// Builds a new `Pending` request. Lines are checked for shape only;
    /// products and stock are not looked at until approval.
    pub fn submit(
        id: String,
        customer_id: String,
        items: Vec<OrderLine>,
        customer_note: Option<String>,
        special_instructions: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_lines(&items)?;
        Ok(OrderRequest {
            id,
            customer_id,
            status: RequestStatus::Pending,
            customer_note,
            special_instructions,
            decision_note: None,
            decided_by: None,
            decided_at: None,
            order_id: None,
            items,
            requested_at: now,
            updated_at: now,
        })
    }

    pub fn ensure_pending(&self) -> CoreResult<()> {
        if self.status != RequestStatus::Pending {
            return Err(CoreError::RequestAlreadyDecided {
                request_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    pub fn approve(
        &mut self,
        decided_by: String,
        decision_note: Option<String>,
        order_id: String,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_pending()?;
        self.status = RequestStatus::Approved;
        self.decided_by = Some(decided_by);
        self.decision_note = decision_note;
        self.decided_at = Some(now);
        self.order_id = Some(order_id);
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(
        &mut self,
        decided_by: Option<String>,
        decision_note: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_pending()?;
        self.status = RequestStatus::Rejected;
        self.decided_by = decided_by;
        self.decision_note = decision_note;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> OrderRequest {
        OrderRequest::submit(
            "r-1".to_string(),
            "c-1".to_string(),
            vec![OrderLine::new("p-1", 2)],
            Some("urgent".to_string()),
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_submit_validates_lines() {
        let empty = OrderRequest::submit(
            "r".into(),
            "c".into(),
            vec![],
            None,
            None,
            Utc::now(),
        );
        assert!(matches!(empty, Err(CoreError::Validation(_))));

        let zero = OrderRequest::submit(
            "r".into(),
            "c".into(),
            vec![OrderLine::new("p", 0)],
            None,
            None,
            Utc::now(),
        );
        assert!(matches!(zero, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_approve_records_decision() {
        let mut req = pending();
        req.approve("admin".into(), Some("ok".into()), "o-1".into(), Utc::now())
            .unwrap();
        assert_eq!(req.status, RequestStatus::Approved);
        assert_eq!(req.decided_by.as_deref(), Some("admin"));
        assert_eq!(req.order_id.as_deref(), Some("o-1"));
        assert!(req.decided_at.is_some());
    }

    #[test]
    fn test_second_decision_conflicts_and_changes_nothing() {
        let mut req = pending();
        req.reject(None, Some("no stock".into()), Utc::now()).unwrap();

        let err = req
            .approve("admin".into(), Some("retry".into()), "o-2".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::RequestAlreadyDecided { ref status, .. } if status == "Rejected"
        ));
        assert_eq!(req.status, RequestStatus::Rejected);
        assert_eq!(req.decision_note.as_deref(), Some("no stock"));
        assert!(req.order_id.is_none());

        assert!(req.reject(None, None, Utc::now()).is_err());
        assert_eq!(req.decision_note.as_deref(), Some("no stock"));
    }
}

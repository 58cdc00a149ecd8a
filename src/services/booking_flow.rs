//! Booking wizard controller.
//!
//! `BookingFlow` owns one `BookingDraft` and walks it through
//! Schedule → Service (→ PickupDetails) → Confirmation. Every accepted
//! mutation recomputes the totals before returning; a rejected one leaves the
//! draft and the totals exactly as they were.

use chrono::{DateTime, Utc};

use crate::error::{FlowError, PricingError};
use crate::models::draft::{
    BookingDraft, DateRange, PaymentMethod, PickupDetails, ServiceType, Step,
};
use crate::models::location::PricingSettings;
use crate::models::voucher::Voucher;
use crate::services::pricing_service::{PriceBreakdown, PricingService};
use crate::services::rate_service::MissingRatePolicy;

#[derive(Debug, Clone)]
pub struct BookingFlow {
    draft: BookingDraft,
    settings: PricingSettings,
    policy: MissingRatePolicy,
    totals: PriceBreakdown,
}

impl BookingFlow {
    /// Starts a wizard over an already filled cart.
    pub fn new(
        draft: BookingDraft,
        settings: PricingSettings,
        policy: MissingRatePolicy,
    ) -> Result<Self, FlowError> {
        if draft.is_empty() {
            return Err(FlowError::EmptyCart);
        }
        let mut flow = Self {
            draft,
            settings,
            policy,
            totals: PriceBreakdown::default(),
        };
        flow.draft.step = Step::Schedule;
        flow.recompute();
        Ok(flow)
    }

    /// Rebuilds a wizard from a handed-off draft, landing on the confirmation step.
    pub fn resume(
        mut draft: BookingDraft,
        settings: PricingSettings,
        policy: MissingRatePolicy,
    ) -> Result<Self, FlowError> {
        if draft.is_empty() {
            return Err(FlowError::EmptyCart);
        }
        draft.step = Step::Confirmation;
        let mut flow = Self {
            draft,
            settings,
            policy,
            totals: PriceBreakdown::default(),
        };
        flow.recompute();
        Ok(flow)
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn totals(&self) -> &PriceBreakdown {
        &self.totals
    }

    pub fn step(&self) -> Step {
        self.draft.step
    }

    fn recompute(&mut self) {
        self.totals = PricingService::calculate(&self.draft, &self.settings, self.policy);
        log::debug!(
            "Recomputed draft totals: subtotal {} pickup {} discount {} final {}",
            self.totals.sub_total,
            self.totals.pickup_fee,
            self.totals.discount_amount,
            self.totals.final_price
        );
    }

    fn require_step(&self, expected: Step) -> Result<(), FlowError> {
        if self.draft.step != expected {
            return Err(FlowError::WrongStep {
                expected,
                actual: self.draft.step,
            });
        }
        Ok(())
    }

    fn first_rate_issue(&self) -> Option<PricingError> {
        self.totals
            .issues
            .iter()
            .find(|issue| matches!(issue, PricingError::RateNotFound { .. }))
            .cloned()
    }

    pub fn set_schedule(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        duration: Option<String>,
    ) -> Result<&PriceBreakdown, FlowError> {
        self.require_step(Step::Schedule)?;
        let dates = DateRange::new(start, end)?;
        let duration = duration
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        self.draft.dates = dates;
        self.draft.duration = duration;
        self.recompute();
        Ok(&self.totals)
    }

    pub fn set_service_type(&mut self, service_type: ServiceType) -> Result<&PriceBreakdown, FlowError> {
        self.require_step(Step::Service)?;
        self.draft.service_type = Some(service_type);
        self.recompute();
        Ok(&self.totals)
    }

    /// Completes the pickup detour and moves on to confirmation.
    pub fn confirm_pickup(&mut self, details: PickupDetails) -> Result<&PriceBreakdown, FlowError> {
        self.require_step(Step::PickupDetails)?;
        details.validate()?;

        self.draft.pickup = Some(PickupDetails {
            address: details.address.trim().to_string(),
            contact_number: details.contact_number.trim().to_string(),
            geolocation: details.geolocation,
        });
        self.draft.step = Step::Confirmation;
        self.recompute();
        Ok(&self.totals)
    }

    /// Leaves the pickup detour without confirming; back to service selection.
    pub fn cancel_pickup(&mut self) -> Result<Step, FlowError> {
        self.require_step(Step::PickupDetails)?;
        self.draft.step = Step::Service;
        Ok(self.draft.step)
    }

    pub fn apply_voucher(&mut self, voucher: Voucher) -> &PriceBreakdown {
        self.draft.voucher = Some(voucher);
        self.recompute();
        &self.totals
    }

    pub fn remove_voucher(&mut self) -> &PriceBreakdown {
        self.draft.voucher = None;
        self.recompute();
        &self.totals
    }

    pub fn set_payment(
        &mut self,
        method: PaymentMethod,
        notes: Option<String>,
    ) -> Result<&PriceBreakdown, FlowError> {
        self.require_step(Step::Confirmation)?;
        self.draft.payment_method = Some(method);
        if let Some(notes) = notes {
            self.draft.notes = notes;
        }
        Ok(&self.totals)
    }

    /// Advances one step if the current step's guard holds.
    pub fn next(&mut self) -> Result<Step, FlowError> {
        let next = match self.draft.step {
            Step::Schedule => {
                if self.draft.duration.is_none() {
                    return Err(FlowError::DurationMissing);
                }
                if self.draft.dates.end < self.draft.dates.start {
                    return Err(FlowError::InvalidDateRange);
                }
                if let Some(issue) = self.first_rate_issue() {
                    return Err(issue.into());
                }
                Step::Service
            }
            Step::Service => match self.draft.service_type {
                None => return Err(FlowError::ServiceTypeMissing),
                Some(ServiceType::Pickup) => Step::PickupDetails,
                Some(ServiceType::SelfDropoff) => Step::Confirmation,
            },
            Step::PickupDetails => match &self.draft.pickup {
                Some(details) => {
                    details.validate()?;
                    Step::Confirmation
                }
                None => return Err(FlowError::PickupDetailsIncomplete("address")),
            },
            Step::Confirmation => return Err(FlowError::AtLastStep),
        };

        log::debug!("Draft step {:?} -> {:?}", self.draft.step, next);
        self.draft.step = next;
        self.recompute();
        Ok(next)
    }

    pub fn back(&mut self) -> Result<Step, FlowError> {
        let previous = match self.draft.step {
            Step::Schedule => return Err(FlowError::AtFirstStep),
            Step::Service => Step::Schedule,
            Step::PickupDetails => Step::Service,
            Step::Confirmation => Step::Service,
        };
        self.draft.step = previous;
        Ok(previous)
    }

    /// Checks everything a submit needs, independent of how the step was reached.
    pub fn validate_submission(&self) -> Result<(), FlowError> {
        self.require_step(Step::Confirmation)?;
        if self.draft.duration.is_none() {
            return Err(FlowError::DurationMissing);
        }
        let service_type = self.draft.service_type.ok_or(FlowError::ServiceTypeMissing)?;
        if self.draft.payment_method.is_none() {
            return Err(FlowError::PaymentMethodMissing);
        }
        if service_type == ServiceType::Pickup {
            match &self.draft.pickup {
                Some(details) => details.validate()?,
                None => return Err(FlowError::PickupDetailsIncomplete("address")),
            }
        }
        if let Some(issue) = self.totals.first_issue() {
            return Err(issue.clone().into());
        }
        Ok(())
    }

    /// Clears the draft after a completed or abandoned booking.
    pub fn reset(&mut self) {
        let dates = self.draft.dates;
        self.draft = BookingDraft::new(dates);
        self.totals = PriceBreakdown::default();
    }

    pub fn into_draft(self) -> BookingDraft {
        self.draft
    }
}

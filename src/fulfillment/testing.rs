//! Scripted aggregator for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::shipping::{
    AggregatorError, AssignCourierRequest, AssignedCourier, PushOrderRequest, PushedOrder, RateCalculatorRequest,
    RateCourier, ShippingAggregator,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call { Rate, Push(String), Assign(u64) }

#[derive(Default)]
pub struct ScriptedAggregator {
    rates: Vec<RateCourier>,
    failing: HashSet<u64>,
    awbs: HashMap<u64, String>,
    fail_rates: bool,
    fail_push: bool,
    push_gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<Call>>,
    pushes: Mutex<Vec<PushOrderRequest>>,
    assigns: Mutex<Vec<AssignCourierRequest>>,
}

pub fn offer(id: u64, name: &str, total_charges: i64) -> RateCourier {
    RateCourier {
        id, name: name.to_string(), estimated_delivery: "3-5 days".into(), before_tax_total_charges: total_charges,
        gst: 0, total_charges, minimum_chargeable_weight: "0.5".into(), pickups_automatically_scheduled: true,
    }
}

impl ScriptedAggregator {
    pub fn new(rates: Vec<RateCourier>) -> Self { Self { rates, ..Default::default() } }
    pub fn failing_couriers(mut self, ids: &[u64]) -> Self { self.failing.extend(ids); self }
    pub fn with_awb(mut self, id: u64, awb: &str) -> Self { self.awbs.insert(id, awb.to_string()); self }
    pub fn failing_rates(mut self) -> Self { self.fail_rates = true; self }
    pub fn failing_push(mut self) -> Self { self.fail_push = true; self }
    /// Push records the request, then waits for `gate` before answering.
    pub fn blocking_push(mut self, gate: Arc<Notify>) -> Self { self.push_gate = Some(gate); self }

    pub fn calls(&self) -> Vec<Call> { self.calls.lock().map(|c| c.clone()).unwrap_or_default() }
    pub fn push_requests(&self) -> Vec<PushOrderRequest> { self.pushes.lock().map(|c| c.clone()).unwrap_or_default() }
    pub fn assign_requests(&self) -> Vec<AssignCourierRequest> { self.assigns.lock().map(|c| c.clone()).unwrap_or_default() }
    pub fn assign_attempts(&self) -> Vec<u64> {
        self.calls().into_iter().filter_map(|c| match c { Call::Assign(id) => Some(id), _ => None }).collect()
    }

    fn record(&self, call: Call) { if let Ok(mut c) = self.calls.lock() { c.push(call); } }
}

#[async_trait]
impl ShippingAggregator for ScriptedAggregator {
    async fn rate_calculator(&self, _req: &RateCalculatorRequest) -> Result<Vec<RateCourier>, AggregatorError> {
        self.record(Call::Rate);
        if self.fail_rates { return Err(AggregatorError::Timeout { endpoint: "rate-calculator" }); }
        Ok(self.rates.clone())
    }

    async fn push_order(&self, req: &PushOrderRequest) -> Result<PushedOrder, AggregatorError> {
        self.record(Call::Push(req.order_id.clone()));
        if let Ok(mut p) = self.pushes.lock() { p.push(req.clone()); }
        if let Some(gate) = &self.push_gate { gate.notified().await; }
        if self.fail_push {
            return Err(AggregatorError::Rejected { endpoint: "push-order", message: "Invalid warehouse".into() });
        }
        Ok(PushedOrder { order_id: format!("SM-{}", req.order_id) })
    }

    async fn assign_courier(&self, req: &AssignCourierRequest) -> Result<AssignedCourier, AggregatorError> {
        self.record(Call::Assign(req.courier_id));
        if let Ok(mut a) = self.assigns.lock() { a.push(req.clone()); }
        if self.failing.contains(&req.courier_id) {
            return Err(AggregatorError::Rejected { endpoint: "assign-courier", message: "Assign courier failed".into() });
        }
        let name = self.rates.iter().find(|r| r.id == req.courier_id).map(|r| r.name.clone());
        Ok(AssignedCourier {
            courier: name,
            reference_id: Some(format!("REF{}", req.courier_id)),
            awb_number: self.awbs.get(&req.courier_id).cloned().unwrap_or_else(|| format!("AWB{}", req.courier_id)),
        })
    }
}

//! Courier assignment: cheapest courier first, falling through on failure.

use tracing::{error, info, warn};

use super::rate_quote::{cheapest_first, quote, RateQuery};
use crate::domain::aggregates::CourierAssignment;
use crate::shipping::{AssignCourierRequest, ShippingAggregator};
use crate::FulfillmentError;

/// Quote once, then try each offer in ascending price order against the
/// already-pushed shipment `shipment_id`. Attempts run one after another; a
/// failed attempt is logged and the next offer is tried.
pub async fn assign_cheapest(
    aggregator: &dyn ShippingAggregator,
    shipment_id: &str,
    query: &RateQuery,
) -> Result<CourierAssignment, FulfillmentError> {
    let mut offers = quote(aggregator, query).await?;
    cheapest_first(&mut offers);

    for offer in &offers {
        info!(shipment_id, courier_id = offer.courier_id, courier = %offer.name, price = offer.total_charges, "trying courier");
        let req = AssignCourierRequest { order_id: shipment_id.to_string(), courier_id: offer.courier_id };
        match aggregator.assign_courier(&req).await {
            Ok(assigned) if assigned.awb_number.trim().is_empty() => {
                warn!(shipment_id, courier = %offer.name, "courier assigned without an AWB");
            }
            Ok(assigned) => {
                info!(shipment_id, courier = %offer.name, awb = %assigned.awb_number, "courier assigned");
                return Ok(CourierAssignment {
                    courier_id: offer.courier_id,
                    courier_name: assigned.courier.filter(|c| !c.is_empty()).unwrap_or_else(|| offer.name.clone()),
                    reference_id: assigned.reference_id,
                    tracking_url: aggregator.tracking_url(&assigned.awb_number),
                    awb_number: assigned.awb_number,
                    estimated_delivery: Some(offer.estimated_delivery.clone()).filter(|e| !e.is_empty()),
                });
            }
            Err(e) => warn!(shipment_id, courier = %offer.name, error = %e, "courier assignment failed"),
        }
    }

    error!(shipment_id, attempted = offers.len(), "no courier service available");
    Err(FulfillmentError::CourierAssignmentExhausted { attempted: offers.len() })
}

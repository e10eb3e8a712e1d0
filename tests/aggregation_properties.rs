use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use storepulse::analysis::summarize;
use storepulse::models::{
    AnalyticsSummary, FinancialStatus, FulfillmentStatus, LineItem, Money, OrderRecord,
    ShippingLocation,
};

const PRODUCTS: [&str; 4] = ["Mug", "Tee", "Cap", "Poster"];
const CITIES: [&str; 3] = ["Springfield", "Shelbyville", "Ogdenville"];

fn order_strategy() -> impl Strategy<Value = OrderRecord> {
    (
        1u32..=12,
        0i64..100_000,
        proptest::option::of(0usize..6),
        proptest::collection::vec((0usize..PRODUCTS.len(), 1u64..5, 0i64..5_000), 0..4),
        proptest::option::of(0usize..CITIES.len()),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(month, cents, customer, lines, city, fulfilled, paid)| {
            let at = Utc.with_ymd_and_hms(2024, month, 15, 12, 0, 0).unwrap();
            OrderRecord {
                id: format!("gid://shopify/Order/{}", cents),
                created_at: Some(at),
                processed_at: Some(at),
                total: Money::new(Decimal::new(cents, 2), "USD"),
                fulfillment_status: if fulfilled {
                    FulfillmentStatus::Fulfilled
                } else {
                    FulfillmentStatus::Unfulfilled
                },
                financial_status: if paid {
                    FinancialStatus::Paid
                } else {
                    FinancialStatus::Unpaid
                },
                customer_id: customer.map(|c| format!("customer-{}", c)),
                line_items: lines
                    .into_iter()
                    .map(|(product, quantity, price)| LineItem {
                        product_id: None,
                        title: PRODUCTS[product].to_string(),
                        quantity,
                        unit_price: Decimal::new(price, 2),
                    })
                    .collect(),
                shipping: city.map(|c| ShippingLocation {
                    city: Some(CITIES[c].to_string()),
                    ..Default::default()
                }),
            }
        })
}

fn orders_and_shuffle() -> impl Strategy<Value = (Vec<OrderRecord>, Vec<OrderRecord>)> {
    proptest::collection::vec(order_strategy(), 0..40)
        .prop_flat_map(|orders| (Just(orders.clone()), Just(orders).prop_shuffle()))
}

/// Ranked lists only differ in tie order, so compare them by key.
fn order_insensitive(mut summary: AnalyticsSummary) -> AnalyticsSummary {
    summary.top_products.sort_by(|a, b| a.title.cmp(&b.title));
    summary.top_locations.sort_by(|a, b| a.location.cmp(&b.location));
    summary
}

proptest! {
    #[test]
    fn summary_is_independent_of_input_order((orders, shuffled) in orders_and_shuffle()) {
        let left = order_insensitive(summarize(&orders, 2024, usize::MAX));
        let right = order_insensitive(summarize(&shuffled, 2024, usize::MAX));

        prop_assert_eq!(left, right);
    }

    #[test]
    fn monthly_buckets_cover_in_year_orders(orders in proptest::collection::vec(order_strategy(), 0..40)) {
        let summary = summarize(&orders, 2024, 10);

        prop_assert_eq!(summary.monthly_data.len(), 12);

        let bucket_orders: u64 = summary.monthly_data.iter().map(|b| b.orders).sum();
        let bucket_revenue: Decimal = summary.monthly_data.iter().map(|b| b.revenue).sum();
        prop_assert_eq!(bucket_orders, summary.total_orders);
        prop_assert_eq!(bucket_revenue, summary.total_revenue);
    }

    #[test]
    fn every_customer_lands_in_one_segment(orders in proptest::collection::vec(order_strategy(), 0..40)) {
        let summary = summarize(&orders, 2024, 10);

        let mut customers: Vec<&str> = orders.iter().filter_map(|o| o.customer_id.as_deref()).collect();
        customers.sort_unstable();
        customers.dedup();

        prop_assert_eq!(summary.customer_segments.total(), customers.len() as u64);
        prop_assert!(summary.top_products.len() <= 10);
        prop_assert!(summary.top_locations.len() <= 10);
    }
}

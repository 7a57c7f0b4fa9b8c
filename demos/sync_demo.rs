//! Sync run over an in-memory accounting API

use chrono::NaiveDate;
use payment_reconciler::utils::MemoryApi;
use payment_reconciler::{
    EntityKind, EntityRef, Invoice, MatchStrategy, Payment, ReconcileConfig, SyncService,
};

fn with_parties<T>(record: T, set: fn(T, EntityKind, EntityRef) -> T) -> T {
    let record = set(record, EntityKind::Agent, EntityRef::new("counterparty/yug"));
    let record = set(
        record,
        EntityKind::OrganizationAccount,
        EntityRef::new("organization/we/accounts/alfa"),
    );
    set(record, EntityKind::Organization, EntityRef::new("organization/we"))
}

fn seed(api: &MemoryApi) {
    let issued = NaiveDate::from_ymd_opt(2025, 2, 19).expect("valid date");

    // Three invoices issued the same day for the same amount
    for number in ["1019", "1020", "1021"] {
        api.insert_invoice(with_parties(
            Invoice::new(format!("inv-{number}"), number.to_string(), issued, 4_048_750),
            Invoice::with_entity,
        ));
    }

    let purposes = [
        ("pay-1", "Оплата по сч/ф 1021 от 19.02.2025 по договору № Б/Н от 16.12.2024"),
        ("pay-2", "Оплата по сч/ф 1020 от 19.02.2025 по договору № Б/Н от 16.12.2024"),
        ("pay-3", "Возврат средств"),
    ];
    for (id, purpose) in purposes {
        api.insert_payment(with_parties(
            Payment::new(id.to_string(), 4_048_750, Some(purpose.to_string())),
            Payment::with_entity,
        ));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Payment Reconciler - Sync Demo\n");

    for strategy in [MatchStrategy::Legacy, MatchStrategy::NumberAndDate] {
        let api = MemoryApi::new();
        seed(&api);

        let config = ReconcileConfig::default().with_strategy(strategy);
        let mut service = SyncService::with_config(api.clone(), &config)?;

        println!("🔎 Strategy: {strategy:?}");
        let outcome = service.plan().await?;
        for matched in &outcome.matches {
            println!(
                "  ✓ {} → {} ({:?})",
                matched.payment_id, matched.invoice_id, matched.evidence
            );
        }
        for left in &outcome.unattached {
            println!("  ✗ {} left unattached: {}", left.payment_id, left.reason);
        }

        service.apply(&outcome).await?;
        for number in ["1019", "1020", "1021"] {
            if let Some(invoice) = api.invoice(&format!("inv-{number}")) {
                println!(
                    "  📄 invoice {}: paid {} of {} by {} payment(s)",
                    invoice.name,
                    invoice.paid,
                    invoice.total,
                    invoice.payments.len()
                );
            }
        }
        println!();
    }

    Ok(())
}

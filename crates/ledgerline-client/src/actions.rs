use std::sync::Arc;

use ledgerline_cache::{QueryCache, QueryKey};
use ledgerline_core::{
    AdjustmentKind, CreditNote, CreditNoteDraft, Customer, LedgerEntry, LedgerEntryDraft,
    PayrollAdjustment, PayrollEntry, ProformaDraft, ProformaInvoice, Project, Supplier,
    SupplierDraft, parse_amount,
};
use ledgerline_finance::{
    JournalKind, JournalRequest, LedgerForm, LedgerSummary, Lifecycle, ManualEntryForm,
    PayrollAction, PayrollError, ProformaAction, ValidationIssue, build_journal_pair,
    build_manual_entry, compute_totals, ensure_adjustable, validate_line_items,
    working_days,
};
use ledgerline_platform::{
    AdjustmentRequest, ClearPeriodResponse, ConvertResponse, CreditNotePayload, GenerateResponse,
    JournalResponse, JournalSubmission, LedgerQuery, ListResponse, Paginated, PayrollQuery,
    PeriodRequest, ProformaPayload, StatusUpdate, SupplierQuery,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::backend::{ApiRequest, LedgerBackend, Method};
use crate::endpoints::{self, action, item};
use crate::error::ActionError;

/// Actions the ERP screens perform. The cache handle is shared with whoever
/// else reads the same queries.
pub struct LedgerClient<B> {
    backend: B,
    cache: Arc<QueryCache>,
}

impl<B: LedgerBackend> LedgerClient<B> {
    pub fn new(backend: B, cache: Arc<QueryCache>) -> Self {
        Self { backend, cache }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    // General ledger

    pub async fn ledger_entries(
        &self,
        query: &LedgerQuery,
    ) -> Result<Paginated<LedgerEntry>, ActionError> {
        let key = with_pairs(QueryKey::new(endpoints::GENERAL_LEDGER), query.pairs());
        let list: ListResponse<LedgerEntry> = self.fetch(key).await?;
        Ok(list.into_page())
    }

    pub async fn ledger_summary(&self, query: &LedgerQuery) -> Result<LedgerSummary, ActionError> {
        let key = with_pairs(
            QueryKey::new(endpoints::GENERAL_LEDGER_SUMMARY),
            query.pairs(),
        );
        self.fetch(key).await
    }

    /// Validates the receivable/payable form and posts the balanced pair.
    pub async fn post_journal(
        &self,
        form: LedgerForm,
        kind: JournalKind,
    ) -> Result<JournalResponse, ActionError> {
        let request = form.into_journal_request(kind)?;
        self.submit_journal(&request).await
    }

    pub async fn submit_journal(
        &self,
        request: &JournalRequest,
    ) -> Result<JournalResponse, ActionError> {
        let pair = build_journal_pair(request)?;
        let journal_id = pair.journal_id;
        let entries = pair.into_rows();
        let body = JournalSubmission {
            journal_id,
            entries,
        };
        self.mutate(
            "post journal",
            Method::Post,
            endpoints::GENERAL_LEDGER_JOURNAL.to_string(),
            Some(to_body(&body)?),
            &[endpoints::GENERAL_LEDGER],
        )
        .await
    }

    /// Posts one unpaired row from the general-ledger page.
    pub async fn post_manual_entry(
        &self,
        form: &ManualEntryForm,
    ) -> Result<LedgerEntry, ActionError> {
        let draft = build_manual_entry(form)?;
        info!(
            "posting single-sided {:?} row to {}",
            draft.direction(),
            draft.account_name
        );
        self.mutate(
            "post ledger entry",
            Method::Post,
            endpoints::GENERAL_LEDGER.to_string(),
            Some(to_body(&draft)?),
            &[endpoints::GENERAL_LEDGER],
        )
        .await
    }

    pub async fn update_entry(
        &self,
        id: i64,
        draft: &LedgerEntryDraft,
    ) -> Result<LedgerEntry, ActionError> {
        self.mutate(
            "update ledger entry",
            Method::Put,
            item(endpoints::GENERAL_LEDGER, id),
            Some(to_body(draft)?),
            &[endpoints::GENERAL_LEDGER],
        )
        .await
    }

    // Credit notes

    pub async fn credit_notes(&self) -> Result<Vec<CreditNote>, ActionError> {
        let list: ListResponse<CreditNote> =
            self.fetch(QueryKey::new(endpoints::CREDIT_NOTES)).await?;
        Ok(list.into_items())
    }

    pub async fn credit_note(&self, id: i64) -> Result<CreditNote, ActionError> {
        self.fetch(QueryKey::new(item(endpoints::CREDIT_NOTES, id)))
            .await
    }

    pub async fn create_credit_note(
        &self,
        note: CreditNoteDraft,
    ) -> Result<CreditNote, ActionError> {
        let payload = credit_note_payload(note)?;
        self.mutate(
            "create credit note",
            Method::Post,
            endpoints::CREDIT_NOTES.to_string(),
            Some(to_body(&payload)?),
            &[endpoints::CREDIT_NOTES],
        )
        .await
    }

    pub async fn update_credit_note(
        &self,
        id: i64,
        note: CreditNoteDraft,
    ) -> Result<CreditNote, ActionError> {
        let payload = credit_note_payload(note)?;
        self.mutate(
            "update credit note",
            Method::Put,
            item(endpoints::CREDIT_NOTES, id),
            Some(to_body(&payload)?),
            &[endpoints::CREDIT_NOTES],
        )
        .await
    }

    pub async fn delete_credit_note(&self, id: i64) -> Result<(), ActionError> {
        let _: Value = self
            .mutate(
                "delete credit note",
                Method::Delete,
                item(endpoints::CREDIT_NOTES, id),
                None,
                &[endpoints::CREDIT_NOTES],
            )
            .await?;
        Ok(())
    }

    // Proforma invoices

    pub async fn proforma_invoices(&self) -> Result<Vec<ProformaInvoice>, ActionError> {
        let list: ListResponse<ProformaInvoice> = self
            .fetch(QueryKey::new(endpoints::PROFORMA_INVOICES))
            .await?;
        Ok(list.into_items())
    }

    pub async fn proforma_invoice(&self, id: i64) -> Result<ProformaInvoice, ActionError> {
        self.fetch(QueryKey::new(item(endpoints::PROFORMA_INVOICES, id)))
            .await
    }

    pub async fn create_proforma(
        &self,
        proforma: ProformaDraft,
    ) -> Result<ProformaInvoice, ActionError> {
        let payload = proforma_payload(proforma)?;
        self.mutate(
            "create proforma invoice",
            Method::Post,
            endpoints::PROFORMA_INVOICES.to_string(),
            Some(to_body(&payload)?),
            &[endpoints::PROFORMA_INVOICES],
        )
        .await
    }

    pub async fn update_proforma(
        &self,
        id: i64,
        proforma: ProformaDraft,
    ) -> Result<ProformaInvoice, ActionError> {
        let payload = proforma_payload(proforma)?;
        self.mutate(
            "update proforma invoice",
            Method::Put,
            item(endpoints::PROFORMA_INVOICES, id),
            Some(to_body(&payload)?),
            &[endpoints::PROFORMA_INVOICES],
        )
        .await
    }

    pub async fn approve_proforma(
        &self,
        proforma: &ProformaInvoice,
    ) -> Result<ProformaInvoice, ActionError> {
        let status = proforma.proforma.status.apply(ProformaAction::Approve)?;
        self.mutate(
            "approve proforma invoice",
            Method::Put,
            item(endpoints::PROFORMA_INVOICES, proforma.id),
            Some(to_body(&StatusUpdate { status })?),
            &[endpoints::PROFORMA_INVOICES],
        )
        .await
    }

    /// Converts an approved proforma into a sales invoice on the server.
    pub async fn convert_proforma(
        &self,
        proforma: &ProformaInvoice,
    ) -> Result<ConvertResponse, ActionError> {
        proforma.proforma.status.apply(ProformaAction::Convert)?;
        self.mutate(
            "convert proforma invoice",
            Method::Post,
            action(endpoints::PROFORMA_INVOICES, proforma.id, "convert-to-invoice"),
            None,
            &[endpoints::PROFORMA_INVOICES, endpoints::GENERAL_LEDGER],
        )
        .await
    }

    // Payroll

    pub async fn payroll(&self, query: &PayrollQuery) -> Result<Vec<PayrollEntry>, ActionError> {
        let key = with_pairs(QueryKey::new(endpoints::PAYROLL), query.pairs());
        let list: ListResponse<PayrollEntry> = self.fetch(key).await?;
        Ok(list.into_items())
    }

    pub async fn payroll_entry(&self, id: i64) -> Result<PayrollEntry, ActionError> {
        self.fetch(QueryKey::new(item(endpoints::PAYROLL, id))).await
    }

    pub async fn generate_payroll(
        &self,
        month: i32,
        year: i32,
    ) -> Result<GenerateResponse, ActionError> {
        working_days(year, month)?;
        self.mutate(
            "generate payroll",
            Method::Post,
            endpoints::PAYROLL_GENERATE.to_string(),
            Some(to_body(&PeriodRequest { month, year })?),
            &[endpoints::PAYROLL],
        )
        .await
    }

    pub async fn clear_payroll_period(
        &self,
        month: i32,
        year: i32,
    ) -> Result<ClearPeriodResponse, ActionError> {
        working_days(year, month)?;
        self.mutate(
            "clear payroll period",
            Method::Post,
            endpoints::PAYROLL_CLEAR_PERIOD.to_string(),
            Some(to_body(&PeriodRequest { month, year })?),
            &[endpoints::PAYROLL],
        )
        .await
    }

    pub async fn delete_payroll_entry(&self, id: i64) -> Result<(), ActionError> {
        let _: Value = self
            .mutate(
                "delete payroll entry",
                Method::Delete,
                item(endpoints::PAYROLL, id),
                None,
                &[endpoints::PAYROLL],
            )
            .await?;
        Ok(())
    }

    pub async fn approve_payroll(&self, entry: &PayrollEntry) -> Result<PayrollEntry, ActionError> {
        let status = entry.status.apply(PayrollAction::Approve)?;
        self.mutate(
            "approve payroll",
            Method::Put,
            item(endpoints::PAYROLL, entry.id),
            Some(to_body(&StatusUpdate { status })?),
            &[endpoints::PAYROLL],
        )
        .await
    }

    /// Marks an approved entry paid. The server posts the salary journal, so
    /// the ledger queries are invalidated as well.
    pub async fn mark_payroll_paid(
        &self,
        entry: &PayrollEntry,
    ) -> Result<PayrollEntry, ActionError> {
        let status = entry.status.apply(PayrollAction::MarkPaid)?;
        self.mutate(
            "pay payroll",
            Method::Put,
            item(endpoints::PAYROLL, entry.id),
            Some(to_body(&StatusUpdate { status })?),
            &[endpoints::PAYROLL, endpoints::GENERAL_LEDGER],
        )
        .await
    }

    pub async fn payroll_adjustments(
        &self,
        payroll_id: i64,
        kind: AdjustmentKind,
    ) -> Result<Vec<PayrollAdjustment>, ActionError> {
        let key = QueryKey::new(action(endpoints::PAYROLL, payroll_id, kind.path_segment()));
        let list: ListResponse<PayrollAdjustment> = self.fetch(key).await?;
        Ok(list.into_items())
    }

    pub async fn add_payroll_adjustment(
        &self,
        entry: &PayrollEntry,
        kind: AdjustmentKind,
        description: &str,
        amount: &str,
    ) -> Result<PayrollAdjustment, ActionError> {
        ensure_adjustable(entry.status)?;
        if description.trim().is_empty() {
            return Err(ValidationIssue::MissingDescription.into());
        }
        let amount = parse_amount(amount)?;
        if amount <= Decimal::ZERO {
            return Err(PayrollError::NonPositiveAdjustment.into());
        }

        let body = AdjustmentRequest {
            description: description.trim().to_string(),
            amount,
        };
        self.mutate(
            "add payroll adjustment",
            Method::Post,
            action(endpoints::PAYROLL, entry.id, kind.path_segment()),
            Some(to_body(&body)?),
            &[endpoints::PAYROLL],
        )
        .await
    }

    pub async fn remove_payroll_adjustment(
        &self,
        entry: &PayrollEntry,
        kind: AdjustmentKind,
        adjustment_id: i64,
    ) -> Result<(), ActionError> {
        ensure_adjustable(entry.status)?;
        let path = format!(
            "{}/{adjustment_id}",
            action(endpoints::PAYROLL, entry.id, kind.path_segment())
        );
        let _: Value = self
            .mutate(
                "remove payroll adjustment",
                Method::Delete,
                path,
                None,
                &[endpoints::PAYROLL],
            )
            .await?;
        Ok(())
    }

    // Parties

    pub async fn suppliers(&self, query: &SupplierQuery) -> Result<Vec<Supplier>, ActionError> {
        let key = QueryKey::new(endpoints::SUPPLIERS)
            .param("includeArchived", query.include_archived.then_some(true))
            .param(
                "search",
                query
                    .search
                    .as_deref()
                    .map(str::trim)
                    .filter(|search| !search.is_empty()),
            );
        let list: ListResponse<Supplier> = self.fetch(key).await?;
        Ok(list.into_items())
    }

    pub async fn create_supplier(&self, supplier: &SupplierDraft) -> Result<Supplier, ActionError> {
        require_name(&supplier.name)?;
        self.mutate(
            "create supplier",
            Method::Post,
            endpoints::SUPPLIERS.to_string(),
            Some(to_body(supplier)?),
            &[endpoints::SUPPLIERS],
        )
        .await
    }

    pub async fn update_supplier(
        &self,
        id: i64,
        supplier: &SupplierDraft,
    ) -> Result<Supplier, ActionError> {
        require_name(&supplier.name)?;
        self.mutate(
            "update supplier",
            Method::Put,
            item(endpoints::SUPPLIERS, id),
            Some(to_body(supplier)?),
            &[endpoints::SUPPLIERS],
        )
        .await
    }

    pub async fn archive_supplier(&self, id: i64) -> Result<Supplier, ActionError> {
        self.mutate(
            "archive supplier",
            Method::Post,
            action(endpoints::SUPPLIERS, id, "archive"),
            None,
            &[endpoints::SUPPLIERS],
        )
        .await
    }

    pub async fn unarchive_supplier(&self, id: i64) -> Result<Supplier, ActionError> {
        self.mutate(
            "unarchive supplier",
            Method::Post,
            action(endpoints::SUPPLIERS, id, "unarchive"),
            None,
            &[endpoints::SUPPLIERS],
        )
        .await
    }

    pub async fn customers(&self) -> Result<Vec<Customer>, ActionError> {
        let list: ListResponse<Customer> = self.fetch(QueryKey::new(endpoints::CUSTOMERS)).await?;
        Ok(list.into_items())
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ActionError> {
        let list: ListResponse<Project> = self.fetch(QueryKey::new(endpoints::PROJECTS)).await?;
        Ok(list.into_items())
    }

    async fn fetch<T>(&self, key: QueryKey) -> Result<T, ActionError>
    where
        T: Serialize + DeserializeOwned,
    {
        let request = ApiRequest::get(key.endpoint(), key.query_pairs());
        self.cache
            .get_or_fetch(key, || async move {
                let body = self.backend.send(request).await?;
                Ok::<T, ActionError>(serde_json::from_value(body)?)
            })
            .await
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        label: &str,
        method: Method,
        path: String,
        body: Option<Value>,
        invalidates: &[&str],
    ) -> Result<T, ActionError> {
        match self
            .backend
            .send(ApiRequest::with_body(method, path, body))
            .await
        {
            Ok(response) => {
                for prefix in invalidates {
                    self.cache.invalidate_endpoint(prefix).await;
                }
                Ok(serde_json::from_value(response)?)
            }
            Err(err) => {
                warn!("{label} failed: {}", err.user_message());
                Err(err)
            }
        }
    }
}

fn with_pairs(key: QueryKey, pairs: Vec<(&'static str, String)>) -> QueryKey {
    pairs
        .into_iter()
        .fold(key, |key, (name, value)| key.param(name, Some(value)))
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ActionError> {
    Ok(serde_json::to_value(value)?)
}

fn require_name(name: &str) -> Result<(), ActionError> {
    if name.trim().is_empty() {
        return Err(ValidationIssue::MissingName.into());
    }
    Ok(())
}

fn credit_note_payload(note: CreditNoteDraft) -> Result<CreditNotePayload, ActionError> {
    validate_line_items(&note.items)?;
    let totals = compute_totals(&note.items, note.discount).formatted();
    Ok(CreditNotePayload { note, totals })
}

fn proforma_payload(proforma: ProformaDraft) -> Result<ProformaPayload, ActionError> {
    validate_line_items(&proforma.items)?;
    let totals = compute_totals(&proforma.items, proforma.discount).formatted();
    Ok(ProformaPayload { proforma, totals })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ledgerline_core::{
        AccountType, CreditNoteStatus, EntryDirection, LineItem, PayrollStatus, ProformaStatus,
    };
    use ledgerline_finance::PartyRef;
    use serde_json::json;

    use super::*;
    use crate::fake::FakeBackend;

    fn client() -> LedgerClient<FakeBackend> {
        LedgerClient::new(FakeBackend::new(), Arc::new(QueryCache::new()))
    }

    fn entry_json(id: i64, account: &str, debit: &str, credit: &str) -> Value {
        json!({
            "id": id,
            "entryType": "receivable",
            "referenceType": "manual",
            "accountName": account,
            "description": "Invoice #1001",
            "debitAmount": debit,
            "creditAmount": credit,
            "entityId": 7,
            "entityName": "Acme",
            "transactionDate": "2024-01-15",
            "status": "pending"
        })
    }

    fn receivable_form() -> LedgerForm {
        LedgerForm {
            description: "Invoice #1001".to_string(),
            amount: "200".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            account_type: Some(AccountType::Customer),
            customer: Some(PartyRef::new(7, "Acme")),
            ..LedgerForm::default()
        }
    }

    fn proforma_json(status: &str) -> Value {
        json!({
            "id": 5,
            "proformaNumber": "PF-2024-0005",
            "customerId": 7,
            "issueDate": "2024-02-01",
            "items": [{"description": "Widget", "quantity": "2", "unitPrice": "50", "taxRate": "10"}],
            "discount": "5",
            "status": status,
            "subtotal": "100.00",
            "taxAmount": "10.00",
            "totalAmount": "105.00"
        })
    }

    fn payroll_json(status: &str) -> Value {
        json!({
            "id": 11,
            "employeeId": 3,
            "employeeName": "Dana",
            "month": 3,
            "year": 2024,
            "workingDays": 21,
            "basicSalary": "3000",
            "totalAdditions": "0",
            "totalDeductions": "0",
            "totalAmount": "3000",
            "status": status
        })
    }

    #[tokio::test]
    async fn journal_posts_balanced_pair_and_refreshes_ledger() {
        let client = client();
        let backend = client.backend();
        backend.reply(
            Method::Get,
            endpoints::GENERAL_LEDGER,
            json!({"data": [], "pagination": {"page": 1, "limit": 50, "total": 0, "totalPages": 0}}),
        );
        backend.reply(
            Method::Post,
            endpoints::GENERAL_LEDGER_JOURNAL,
            json!({
                "journalId": "7d0c2c55-5a43-4b8f-9d8e-5b2a8b7f0c11",
                "entries": [
                    entry_json(1, "Accounts Receivable", "200", "0"),
                    entry_json(2, "Revenue", "0", "200")
                ]
            }),
        );

        let query = LedgerQuery::default();
        client.ledger_entries(&query).await.unwrap();
        client.ledger_entries(&query).await.unwrap();
        assert_eq!(backend.count(Method::Get, endpoints::GENERAL_LEDGER), 1);

        let response = client
            .post_journal(receivable_form(), JournalKind::Receivable)
            .await
            .unwrap();
        assert_eq!(response.entries.len(), 2);

        let body = backend
            .last_body(Method::Post, endpoints::GENERAL_LEDGER_JOURNAL)
            .unwrap();
        let rows = body["entries"].as_array().unwrap();
        assert_eq!(rows[0]["accountName"], "Accounts Receivable");
        assert_eq!(rows[0]["debitAmount"], "200");
        assert_eq!(rows[0]["creditAmount"], "0");
        assert_eq!(rows[1]["accountName"], "Revenue");
        assert_eq!(rows[1]["creditAmount"], "200");
        assert_eq!(rows[1]["entityId"], 7);
        assert_eq!(rows[0]["journalId"], body["journalId"]);

        client.ledger_entries(&query).await.unwrap();
        assert_eq!(backend.count(Method::Get, endpoints::GENERAL_LEDGER), 2);
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_server() {
        let client = client();
        let form = LedgerForm {
            amount: "0".to_string(),
            ..receivable_form()
        };

        let err = client
            .post_journal(form, JournalKind::Receivable)
            .await
            .unwrap_err();
        assert!(err.is_local());
        assert_eq!(err.user_message(), "Amount must be greater than zero");
        assert!(client.backend().requests().is_empty());
    }

    #[tokio::test]
    async fn server_failure_keeps_cache_and_surfaces_message() {
        let client = client();
        let backend = client.backend();
        backend.reply(Method::Get, endpoints::GENERAL_LEDGER, json!([]));
        backend.fail(
            Method::Post,
            endpoints::GENERAL_LEDGER_JOURNAL,
            422,
            Some("Customer is archived"),
        );

        let query = LedgerQuery::default();
        client.ledger_entries(&query).await.unwrap();
        let err = client
            .post_journal(receivable_form(), JournalKind::Receivable)
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Customer is archived");
        client.ledger_entries(&query).await.unwrap();
        assert_eq!(backend.count(Method::Get, endpoints::GENERAL_LEDGER), 1);
        assert_eq!(backend.count(Method::Post, endpoints::GENERAL_LEDGER_JOURNAL), 1);
    }

    #[tokio::test]
    async fn manual_entry_posts_a_single_row() {
        let client = client();
        client.backend().reply(
            Method::Post,
            endpoints::GENERAL_LEDGER,
            entry_json(9, "Bank Charges", "12.50", "0"),
        );
        let form = ManualEntryForm {
            direction: EntryDirection::Debit,
            account_name: "Bank Charges".to_string(),
            amount: "12.50".to_string(),
            description: "Monthly fee".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 4, 30),
            due_date: None,
            entry_type: None,
            reference_type: None,
            counterpart: None,
            invoice_number: None,
            status: None,
            notes: None,
        };

        let entry = client.post_manual_entry(&form).await.unwrap();
        assert_eq!(entry.id, 9);
        let body = client
            .backend()
            .last_body(Method::Post, endpoints::GENERAL_LEDGER)
            .unwrap();
        assert_eq!(body["debitAmount"], "12.50");
        assert_eq!(body["creditAmount"], "0");
        assert!(body["journalId"].is_null());
    }

    #[tokio::test]
    async fn credit_note_submits_two_decimal_totals() {
        let client = client();
        client.backend().reply(
            Method::Post,
            endpoints::CREDIT_NOTES,
            json!({
                "id": 1,
                "creditNoteNumber": "CN-2024-0001",
                "customerId": 7,
                "issueDate": "2024-02-01",
                "items": [],
                "status": "issued",
                "subtotal": "100.00",
                "taxAmount": "10.00",
                "totalAmount": "105.00"
            }),
        );
        let note = CreditNoteDraft {
            credit_note_number: None,
            customer_id: 7,
            customer_name: Some("Acme".to_string()),
            invoice_number: Some("INV-1001".to_string()),
            issue_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            reason: Some("Damaged goods".to_string()),
            items: vec![
                LineItem::new("Widget", Decimal::new(2, 0), Decimal::new(50, 0))
                    .with_tax_rate(Decimal::new(10, 0)),
            ],
            discount: Decimal::new(5, 0),
            status: CreditNoteStatus::Issued,
            notes: None,
        };

        let created = client.create_credit_note(note).await.unwrap();
        assert_eq!(created.note.credit_note_number.as_deref(), Some("CN-2024-0001"));

        let body = client
            .backend()
            .last_body(Method::Post, endpoints::CREDIT_NOTES)
            .unwrap();
        assert_eq!(body["subtotal"], "100.00");
        assert_eq!(body["taxAmount"], "10.00");
        assert_eq!(body["totalAmount"], "105.00");
        assert_eq!(body["status"], "issued");
    }

    #[tokio::test]
    async fn approved_proforma_converts_and_list_is_refetched() {
        let client = client();
        let backend = client.backend();
        backend.reply(
            Method::Get,
            endpoints::PROFORMA_INVOICES,
            json!([proforma_json("approved")]),
        );
        backend.reply(
            Method::Post,
            "/api/proforma-invoices/5/convert-to-invoice",
            json!({
                "proforma": proforma_json("converted"),
                "invoiceId": 88,
                "invoiceNumber": "INV-PF-2024-0005"
            }),
        );

        let listed = client.proforma_invoices().await.unwrap();
        let approved = &listed[0];
        assert_eq!(
            approved.proforma.status.available_actions(),
            vec![ProformaAction::Convert]
        );

        let converted = client.convert_proforma(approved).await.unwrap();
        assert_eq!(converted.invoice_id, 88);
        assert_eq!(converted.proforma.proforma.status, ProformaStatus::Converted);

        client.proforma_invoices().await.unwrap();
        assert_eq!(backend.count(Method::Get, endpoints::PROFORMA_INVOICES), 2);
    }

    #[tokio::test]
    async fn approving_twice_is_refused_locally() {
        let client = client();
        let approved: ProformaInvoice = serde_json::from_value(proforma_json("approved")).unwrap();

        let err = client.approve_proforma(&approved).await.unwrap_err();
        assert!(matches!(err, ActionError::Transition(_)));
        let err = client
            .convert_proforma(&serde_json::from_value(proforma_json("draft")).unwrap())
            .await
            .unwrap_err();
        assert!(err.is_local());
        assert!(client.backend().requests().is_empty());
    }

    #[tokio::test]
    async fn payroll_approval_locks_adjustments() {
        let client = client();
        client
            .backend()
            .reply(Method::Put, "/api/payroll/11", payroll_json("approved"));
        client.backend().reply(
            Method::Post,
            "/api/payroll/11/additions",
            json!({"id": 1, "payrollId": 11, "kind": "addition", "description": "Overtime", "amount": "150"}),
        );

        let draft: PayrollEntry = serde_json::from_value(payroll_json("draft")).unwrap();
        assert_eq!(draft.status.available_actions(), vec![PayrollAction::Approve]);

        let addition = client
            .add_payroll_adjustment(&draft, AdjustmentKind::Addition, "Overtime", "150")
            .await
            .unwrap();
        assert_eq!(addition.amount, Decimal::new(150, 0));

        let approved = client.approve_payroll(&draft).await.unwrap();
        assert_eq!(approved.status, PayrollStatus::Approved);
        assert_eq!(
            client.backend().last_body(Method::Put, "/api/payroll/11"),
            Some(json!({"status": "approved"}))
        );

        let before = client.backend().requests().len();
        let err = client
            .add_payroll_adjustment(&approved, AdjustmentKind::Deduction, "Advance", "100")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::Payroll(PayrollError::AdjustmentsLocked(PayrollStatus::Approved))
        ));
        assert_eq!(client.backend().requests().len(), before);
    }

    #[tokio::test]
    async fn paying_payroll_refreshes_ledger_queries() {
        let client = client();
        let backend = client.backend();
        backend.reply(Method::Get, endpoints::GENERAL_LEDGER, json!([]));
        backend.reply(Method::Put, "/api/payroll/11", payroll_json("paid"));

        client.ledger_entries(&LedgerQuery::default()).await.unwrap();
        let approved: PayrollEntry = serde_json::from_value(payroll_json("approved")).unwrap();
        let paid = client.mark_payroll_paid(&approved).await.unwrap();
        assert_eq!(paid.status, PayrollStatus::Paid);

        client.ledger_entries(&LedgerQuery::default()).await.unwrap();
        assert_eq!(backend.count(Method::Get, endpoints::GENERAL_LEDGER), 2);
    }

    #[tokio::test]
    async fn payroll_period_is_checked_before_generating() {
        let client = client();
        let err = client.generate_payroll(13, 2024).await.unwrap_err();
        assert_eq!(err.user_message(), "month must be between 1 and 12, got 13");
        assert!(client.backend().requests().is_empty());
    }

    #[tokio::test]
    async fn supplier_filters_become_query_params() {
        let client = client();
        client.backend().reply(
            Method::Get,
            endpoints::SUPPLIERS,
            json!([{"id": 2, "name": "Chairs Ltd", "isArchived": true}]),
        );

        let suppliers = client
            .suppliers(&SupplierQuery {
                include_archived: true,
                search: Some(" chairs ".to_string()),
            })
            .await
            .unwrap();
        assert!(suppliers[0].is_archived);
        assert_eq!(
            client.backend().requests()[0].query,
            vec![
                ("includeArchived".to_string(), "true".to_string()),
                ("search".to_string(), "chairs".to_string()),
            ]
        );

        let err = client
            .create_supplier(&SupplierDraft {
                name: " ".to_string(),
                contact_person: None,
                email: None,
                phone: None,
                address: None,
                tax_number: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Name is required");
    }
}

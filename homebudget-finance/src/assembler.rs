//! Turns parsed input into bills with resolved currencies.

use chrono::NaiveDateTime;
use homebudget_core::{
    AmountParser, Bill, Currency, CurrencyCode, HomebudgetError, Result, to_rub, to_usd,
};

use crate::categories::{CategoryStore, resolve_category};
use crate::rates::{RateCache, RateSource, SnapshotStore};
use crate::stage::{Stage, StageError};
use crate::store::{StoredBill, StoredItem};

/// A bill together with the currency it is denominated in and the USD
/// reference rate of the same day.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledBill {
    pub bill: Bill,
    pub currency: Currency,
    pub usd: Currency,
}

impl AssembledBill {
    /// Ledger row for `user` with RUB and USD equivalents of the bill and each item.
    pub fn to_record(&self, user: &str) -> Result<StoredBill> {
        let items = self
            .bill
            .items
            .iter()
            .map(|item| {
                Ok(StoredItem {
                    title: item.name.clone(),
                    price: item.price,
                    count: item.count,
                    amount: item.sum,
                    currency: self.currency.num_code,
                    amount_rub: to_rub(item.sum, &self.currency)?,
                    amount_usd: to_usd(item.sum, &self.currency, &self.usd)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StoredBill {
            user: user.to_string(),
            bought_at: self.bill.bought_at,
            description: self.bill.description.clone(),
            category: self.bill.category.clone(),
            amount: self.bill.total_amount,
            currency: self.currency.num_code,
            amount_rub: to_rub(self.bill.total_amount, &self.currency)?,
            amount_usd: to_usd(self.bill.total_amount, &self.currency, &self.usd)?,
            items,
        })
    }
}

pub struct BillAssembler<'a, S, St> {
    rates: &'a RateCache<S, St>,
    categories: &'a dyn CategoryStore,
    amounts: AmountParser,
}

impl<'a, S: RateSource, St: SnapshotStore> BillAssembler<'a, S, St> {
    pub fn new(rates: &'a RateCache<S, St>, categories: &'a dyn CategoryStore) -> Self {
        Self::with_parser(rates, categories, AmountParser::default())
    }

    pub fn with_parser(
        rates: &'a RateCache<S, St>,
        categories: &'a dyn CategoryStore,
        amounts: AmountParser,
    ) -> Self {
        Self {
            rates,
            categories,
            amounts,
        }
    }

    /// Bill for a chat message such as `"200€ dinner"`.
    ///
    /// The token is a whole number of currency units; it is stored in minor units.
    pub async fn assemble_text(
        &self,
        token: &str,
        description: &str,
        at: NaiveDateTime,
    ) -> std::result::Result<AssembledBill, StageError> {
        let (amount, code) = self
            .amounts
            .parse_code(token)
            .map_err(|e| Stage::ParsingBill.fail(e))?;
        let total = amount.checked_mul(100).ok_or_else(|| {
            Stage::ParsingBill.fail(HomebudgetError::Format(format!(
                "amount {amount} is too large"
            )))
        })?;

        let category = resolve_category(self.categories, description)
            .map_err(|e| Stage::GettingCategory.fail(e))?;

        let (currency, usd) = self
            .currencies(at, code)
            .await
            .map_err(|e| Stage::GettingCurrency.fail(e))?;

        let bill = Bill::new(total, at, description.trim(), category);
        Ok(AssembledBill {
            bill,
            currency,
            usd,
        })
    }

    /// Attach rates to a parsed receipt. Receipts are always in the local currency.
    pub async fn assemble_receipt(
        &self,
        bill: Bill,
    ) -> std::result::Result<AssembledBill, StageError> {
        let (currency, usd) = self
            .currencies(bill.bought_at, CurrencyCode::LOCAL)
            .await
            .map_err(|e| Stage::GettingCurrency.fail(e))?;

        Ok(AssembledBill {
            bill,
            currency,
            usd,
        })
    }

    async fn currencies(&self, at: NaiveDateTime, code: CurrencyCode) -> Result<(Currency, Currency)> {
        let date = at.date();
        let currency = self.rates.get(date, code).await?;
        let usd = self.rates.get(date, CurrencyCode::USD).await?;
        Ok((currency, usd))
    }
}

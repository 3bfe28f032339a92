//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use ledger_types::{
        AccountId, AccountReader, AccountWriter, CreateAccountParams, Currency, DomainError,
        EntryWriter, LedgerStore, LedgerTx, ListAccountsParams, Page, RepoError, TransferFilter,
        TransferWriter,
    };
    use rand::Rng;

    use crate::SqliteLedger;

    async fn setup_repo() -> SqliteLedger {
        SqliteLedger::in_memory().await.unwrap()
    }

    fn random_owner() -> String {
        let mut rng = rand::rng();
        (0..8)
            .map(|_| rng.random_range(b'a'..=b'z') as char)
            .collect()
    }

    fn random_balance() -> i64 {
        rand::rng().random_range(100..=1000)
    }

    async fn seeded(repo: &SqliteLedger, owner: &str, balance: i64) -> ledger_types::Account {
        repo.create_account(CreateAccountParams {
            owner: owner.to_string(),
            currency: Currency::USD,
            balance,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_account() {
        let repo = setup_repo().await;
        let owner = random_owner();
        let balance = random_balance();

        let account = repo
            .create_account(CreateAccountParams {
                owner: owner.clone(),
                currency: Currency::EUR,
                balance,
            })
            .await
            .unwrap();

        assert_eq!(account.owner, owner);
        assert_eq!(account.balance, balance);
        assert_eq!(account.currency, Currency::EUR);
        assert!(account.id.as_i64() > 0);
    }

    #[tokio::test]
    async fn test_create_account_negative_balance_rejected() {
        let repo = setup_repo().await;

        let result = repo
            .create_account(CreateAccountParams {
                owner: random_owner(),
                currency: Currency::USD,
                balance: -1,
            })
            .await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::ValidationError(_)))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_owner_currency_conflicts() {
        let repo = setup_repo().await;
        let owner = random_owner();
        seeded(&repo, &owner, 0).await;

        let result = repo
            .create_account(CreateAccountParams {
                owner: owner.clone(),
                currency: Currency::USD,
                balance: 0,
            })
            .await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));

        // Same owner, different currency is fine
        repo.create_account(CreateAccountParams {
            owner,
            currency: Currency::CAD,
            balance: 0,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_get_account() {
        let repo = setup_repo().await;
        let created = seeded(&repo, &random_owner(), random_balance()).await;

        let fetched = repo.get_account(created.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.owner, created.owner);
        assert_eq!(fetched.balance, created.balance);
    }

    #[tokio::test]
    async fn test_get_account_not_found() {
        let repo = setup_repo().await;

        let result = repo.get_account(AccountId::from_i64(9999)).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_accounts_paging_and_owner_filter() {
        let repo = setup_repo().await;
        let owner = random_owner();

        for currency in [Currency::USD, Currency::EUR, Currency::CAD] {
            repo.create_account(CreateAccountParams {
                owner: owner.clone(),
                currency,
                balance: 0,
            })
            .await
            .unwrap();
        }
        for _ in 0..4 {
            seeded(&repo, &random_owner(), 0).await;
        }

        let all = repo
            .list_accounts(ListAccountsParams::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 7);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let mine = repo
            .list_accounts(ListAccountsParams {
                owner: Some(owner.clone()),
                page: Page::default(),
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 3);
        assert!(mine.iter().all(|a| a.owner == owner));

        let second_page = repo
            .list_accounts(ListAccountsParams {
                owner: None,
                page: Page {
                    limit: 5,
                    offset: 5,
                },
            })
            .await
            .unwrap();
        assert_eq!(second_page.len(), 2);
        assert_eq!(second_page[0].id, all[5].id);
    }

    #[tokio::test]
    async fn test_delete_account() {
        let repo = setup_repo().await;
        let account = seeded(&repo, &random_owner(), 0).await;

        assert!(repo.delete_account(account.id).await.unwrap());
        assert!(!repo.delete_account(account.id).await.unwrap());
        assert!(repo.get_account(account.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_account_with_entries_conflicts() {
        let repo = setup_repo().await;
        let account = seeded(&repo, &random_owner(), 0).await;

        let mut tx = repo.begin().await.unwrap();
        tx.create_entry(account.id, 10).await.unwrap();
        tx.commit().await.unwrap();

        let result = repo.delete_account(account.id).await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_tx_get_account_for_update() {
        let repo = setup_repo().await;
        let account = seeded(&repo, &random_owner(), 250).await;

        let mut tx = repo.begin().await.unwrap();
        let locked = tx.get_account_for_update(account.id).await.unwrap();
        assert_eq!(locked.balance, 250);

        let missing = tx.get_account_for_update(AccountId::from_i64(9999)).await;
        assert!(matches!(
            missing,
            Err(RepoError::Domain(DomainError::AccountNotFound(_)))
        ));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_add_account_balance_commits() {
        let repo = setup_repo().await;
        let account = seeded(&repo, &random_owner(), 100).await;

        let mut tx = repo.begin().await.unwrap();
        tx.get_account_for_update(account.id).await.unwrap();
        let updated = tx.add_account_balance(account.id, -40).await.unwrap();
        assert_eq!(updated.balance, 60);
        tx.commit().await.unwrap();

        let fetched = repo.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(fetched.balance, 60);
    }

    #[tokio::test]
    async fn test_negative_balance_violates_check() {
        let repo = setup_repo().await;
        let account = seeded(&repo, &random_owner(), 10).await;

        let mut tx = repo.begin().await.unwrap();
        let result = tx.add_account_balance(account.id, -11).await;
        assert!(matches!(result, Err(RepoError::Invariant(_))));
        drop(tx);

        let fetched = repo.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(fetched.balance, 10);
    }

    #[tokio::test]
    async fn test_rollback_discards_all_writes() {
        let repo = setup_repo().await;
        let from = seeded(&repo, &random_owner(), 100).await;
        let to = seeded(&repo, &random_owner(), 0).await;

        let mut tx = repo.begin().await.unwrap();
        let transfer = tx.create_transfer(from.id, to.id, 30).await.unwrap();
        tx.create_entry(from.id, -30).await.unwrap();
        tx.create_entry(to.id, 30).await.unwrap();
        tx.add_account_balance(from.id, -30).await.unwrap();
        tx.add_account_balance(to.id, 30).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(repo.get_transfer(transfer.id).await.unwrap().is_none());
        assert!(
            repo.list_entries(from.id, Page::default())
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(repo.get_account(from.id).await.unwrap().unwrap().balance, 100);
        assert_eq!(repo.get_account(to.id).await.unwrap().unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_entries_and_transfers_readable_after_commit() {
        let repo = setup_repo().await;
        let from = seeded(&repo, &random_owner(), 100).await;
        let to = seeded(&repo, &random_owner(), 0).await;

        let mut tx = repo.begin().await.unwrap();
        let transfer = tx.create_transfer(from.id, to.id, 25).await.unwrap();
        let debit = tx.create_entry(from.id, -25).await.unwrap();
        tx.create_entry(to.id, 25).await.unwrap();
        tx.commit().await.unwrap();

        let fetched = repo.get_transfer(transfer.id).await.unwrap().unwrap();
        assert_eq!(fetched.from_account_id, from.id);
        assert_eq!(fetched.to_account_id, to.id);
        assert_eq!(fetched.amount, 25);

        let entry = repo.get_entry(debit.id).await.unwrap().unwrap();
        assert!(entry.is_debit());
        assert_eq!(entry.account_id, from.id);

        let outgoing = repo
            .list_transfers(
                TransferFilter {
                    from_account_id: Some(from.id),
                    to_account_id: None,
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(outgoing.len(), 1);

        let reversed = repo
            .list_transfers(
                TransferFilter {
                    from_account_id: Some(to.id),
                    to_account_id: Some(from.id),
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert!(reversed.is_empty());
    }

    #[tokio::test]
    async fn test_transfer_amount_must_be_positive() {
        let repo = setup_repo().await;
        let from = seeded(&repo, &random_owner(), 100).await;
        let to = seeded(&repo, &random_owner(), 0).await;

        let mut tx = repo.begin().await.unwrap();
        let result = tx.create_transfer(from.id, to.id, 0).await;
        assert!(matches!(result, Err(RepoError::Invariant(_))));
    }

    #[tokio::test]
    async fn test_entry_for_missing_account_conflicts() {
        let repo = setup_repo().await;

        let mut tx = repo.begin().await.unwrap();
        let result = tx.create_entry(AccountId::from_i64(9999), 10).await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }
}

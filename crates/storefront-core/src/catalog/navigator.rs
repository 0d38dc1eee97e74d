//! Category drill-down state machine.
//!
//! The navigator is either at the root list (empty breadcrumb) or drilled
//! into a category (non-empty breadcrumb, displaying that category's
//! children). It performs no IO itself: transitions return a
//! [`FetchRequest`] that the caller resolves and hands back through
//! [`CategoryNavigator::complete`]. [`CategoryBrowser`] wires this to a
//! [`CategorySource`] for async callers.
//!
//! A failed fetch keeps the breadcrumb and leaves the previously displayed
//! list in place (stale) so the view never goes blank; the error is exposed
//! until the next fetch is issued. Entering a category from a stale list
//! re-bases the breadcrumb on the crumbs that list was loaded for.

use std::future::Future;

use tracing::{debug, warn};

use super::model::{Category, CategoryCrumb};
use crate::api::CatalogError;
use crate::request::{RequestToken, RequestTracker};
use crate::routes::Route;

/// Which category list a fetch targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryScope {
    Root,
    Children(String),
}

/// A category fetch the caller must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: RequestToken,
    pub scope: CategoryScope,
}

/// Result of selecting a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The category has children; the navigator drilled in and needs them.
    Fetch(FetchRequest),
    /// The category is a leaf; the caller should show its product listing.
    /// Navigator state is unchanged.
    Redirect(Route),
}

#[derive(Debug, Default)]
pub struct CategoryNavigator {
    path: Vec<CategoryCrumb>,
    categories: Vec<Category>,
    /// Breadcrumb the displayed `categories` were loaded for.
    displayed_path: Vec<CategoryCrumb>,
    loading: bool,
    error: Option<String>,
    requests: RequestTracker,
}

impl CategoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Breadcrumb from the root to the current category.
    pub fn path(&self) -> &[CategoryCrumb] {
        &self.path
    }

    /// Currently displayed categories.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The category whose children are displayed, `None` at the root.
    pub fn current(&self) -> Option<&CategoryCrumb> {
        self.path.last()
    }

    /// Initial load of the root list. Equivalent to [`Self::go_to_root`].
    pub fn load_root(&mut self) -> FetchRequest {
        self.go_to_root()
    }

    pub fn enter_category(&mut self, category: &Category) -> EnterOutcome {
        if !category.has_children {
            debug!(category_id = %category.id, "leaf category, redirecting to products");
            return EnterOutcome::Redirect(Route::category_products(&category.id));
        }

        if self.path != self.displayed_path {
            debug!(
                depth = self.path.len(),
                displayed_depth = self.displayed_path.len(),
                "entering from a stale list, re-basing breadcrumb"
            );
            self.path.clone_from(&self.displayed_path);
        }
        self.path.push(CategoryCrumb::from(category));
        EnterOutcome::Fetch(self.issue(CategoryScope::Children(category.id.clone())))
    }

    /// Pops one breadcrumb level. Returns `None` (and does nothing) at the root.
    pub fn go_back(&mut self) -> Option<FetchRequest> {
        self.path.pop()?;
        Some(self.issue(self.current_scope()))
    }

    pub fn go_to_root(&mut self) -> FetchRequest {
        self.path.clear();
        self.issue(CategoryScope::Root)
    }

    /// Re-issues the fetch for the current breadcrumb.
    pub fn retry(&mut self) -> FetchRequest {
        self.issue(self.current_scope())
    }

    /// Applies a fetch result. Returns false if the result was discarded
    /// because a newer fetch has been issued since.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<Vec<Category>, CatalogError>,
    ) -> bool {
        if !self.requests.is_latest(token) {
            debug!(token = token.value(), "discarding stale category response");
            return false;
        }

        self.loading = false;
        match result {
            Ok(categories) => {
                self.categories = categories;
                self.displayed_path.clone_from(&self.path);
                self.error = None;
            }
            Err(err) => {
                warn!(error = %err, "category fetch failed");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    fn current_scope(&self) -> CategoryScope {
        match self.path.last() {
            Some(crumb) => CategoryScope::Children(crumb.id.clone()),
            None => CategoryScope::Root,
        }
    }

    fn issue(&mut self, scope: CategoryScope) -> FetchRequest {
        self.loading = true;
        self.error = None;
        let token = self.requests.issue();
        debug!(token = token.value(), ?scope, "issuing category fetch");
        FetchRequest { token, scope }
    }
}

/// Anything that can list categories (the API client, or a fake in tests).
pub trait CategorySource {
    fn fetch_categories(
        &self,
        scope: &CategoryScope,
    ) -> impl Future<Output = Result<Vec<Category>, CatalogError>> + Send;
}

/// Drives a [`CategoryNavigator`] against a [`CategorySource`].
pub struct CategoryBrowser<S> {
    source: S,
    navigator: CategoryNavigator,
}

impl<S: CategorySource> CategoryBrowser<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            navigator: CategoryNavigator::new(),
        }
    }

    pub fn navigator(&self) -> &CategoryNavigator {
        &self.navigator
    }

    pub async fn load_root(&mut self) {
        let request = self.navigator.load_root();
        self.resolve(request).await;
    }

    /// Enters `category`. Returns the product route for leaf categories.
    pub async fn enter(&mut self, category: &Category) -> Option<Route> {
        match self.navigator.enter_category(category) {
            EnterOutcome::Fetch(request) => {
                self.resolve(request).await;
                None
            }
            EnterOutcome::Redirect(route) => Some(route),
        }
    }

    pub async fn back(&mut self) {
        if let Some(request) = self.navigator.go_back() {
            self.resolve(request).await;
        }
    }

    pub async fn root(&mut self) {
        let request = self.navigator.go_to_root();
        self.resolve(request).await;
    }

    pub async fn retry(&mut self) {
        let request = self.navigator.retry();
        self.resolve(request).await;
    }

    async fn resolve(&mut self, request: FetchRequest) {
        let result = self.source.fetch_categories(&request.scope).await;
        self.navigator.complete(request.token, result);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    fn category(id: &str, name: &str, has_children: bool) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            is_active: true,
            url_key: name.to_lowercase(),
            has_children,
        }
    }

    fn root_list() -> Vec<Category> {
        vec![
            category("165", "Apple", true),
            category("12345", "Tools", false),
        ]
    }

    fn apple_children() -> Vec<Category> {
        vec![category("200", "iPhone", true), category("201", "iPad", false)]
    }

    fn iphone_children() -> Vec<Category> {
        vec![category("300", "iPhone 12", false)]
    }

    fn drilled_to_apple() -> CategoryNavigator {
        let mut nav = CategoryNavigator::new();
        let root = nav.load_root();
        nav.complete(root.token, Ok(root_list()));
        let EnterOutcome::Fetch(apple) = nav.enter_category(&category("165", "Apple", true)) else {
            panic!("expected fetch");
        };
        nav.complete(apple.token, Ok(apple_children()));
        nav
    }

    fn drilled_to_iphone() -> CategoryNavigator {
        let mut nav = drilled_to_apple();
        let EnterOutcome::Fetch(iphone) = nav.enter_category(&category("200", "iPhone", true))
        else {
            panic!("expected fetch");
        };
        nav.complete(iphone.token, Ok(iphone_children()));
        nav
    }

    /// In-memory source that records every scope it was asked for.
    #[derive(Default)]
    struct FakeSource {
        lists: HashMap<String, Vec<Category>>,
        failing: Mutex<bool>,
        calls: Mutex<Vec<CategoryScope>>,
    }

    impl FakeSource {
        fn catalog() -> Self {
            let mut lists = HashMap::new();
            lists.insert("root".to_string(), root_list());
            lists.insert("165".to_string(), apple_children());
            lists.insert("200".to_string(), iphone_children());
            Self {
                lists,
                ..Default::default()
            }
        }

        fn fail_next(&self, fail: bool) {
            *self.failing.lock().unwrap() = fail;
        }
    }

    impl CategorySource for &FakeSource {
        async fn fetch_categories(
            &self,
            scope: &CategoryScope,
        ) -> Result<Vec<Category>, CatalogError> {
            self.calls.lock().unwrap().push(scope.clone());
            if *self.failing.lock().unwrap() {
                return Err(CatalogError::Network("connection refused".to_string()));
            }
            let key = match scope {
                CategoryScope::Root => "root",
                CategoryScope::Children(id) => id.as_str(),
            };
            Ok(self.lists.get(key).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_enter_category_with_children_from_root() {
        let mut nav = CategoryNavigator::new();
        let root = nav.load_root();
        assert!(nav.complete(root.token, Ok(root_list())));

        let outcome = nav.enter_category(&category("165", "Apple", true));
        let EnterOutcome::Fetch(request) = outcome else {
            panic!("expected fetch");
        };
        assert_eq!(request.scope, CategoryScope::Children("165".to_string()));
        assert_eq!(
            nav.path(),
            &[CategoryCrumb {
                id: "165".to_string(),
                name: "Apple".to_string()
            }]
        );
        assert!(nav.is_loading());
    }

    #[test]
    fn test_enter_leaf_redirects_without_state_change() {
        let mut nav = CategoryNavigator::new();
        let root = nav.load_root();
        nav.complete(root.token, Ok(root_list()));

        let outcome = nav.enter_category(&category("12345", "Tools", false));
        assert_eq!(
            outcome,
            EnterOutcome::Redirect(Route::category_products("12345"))
        );
        assert_eq!(
            Route::category_products("12345").to_string(),
            "/products?category_id=12345"
        );
        assert!(nav.is_root());
        assert!(!nav.is_loading());
        assert_eq!(nav.categories(), root_list().as_slice());
    }

    #[test]
    fn test_go_back_at_root_is_noop() {
        let mut nav = CategoryNavigator::new();
        assert_eq!(nav.go_back(), None);
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_go_back_from_depth_two_fetches_parent_children() {
        let mut nav = drilled_to_iphone();

        let request = nav.go_back().unwrap();
        assert_eq!(request.scope, CategoryScope::Children("165".to_string()));
        assert_eq!(nav.path().len(), 1);

        let request = nav.go_back().unwrap();
        assert_eq!(request.scope, CategoryScope::Root);
        assert!(nav.is_root());
    }

    #[test]
    fn test_go_to_root_clears_path() {
        let mut nav = drilled_to_iphone();

        let request = nav.go_to_root();
        assert_eq!(request.scope, CategoryScope::Root);
        assert!(nav.path().is_empty());
    }

    #[test]
    fn test_failed_fetch_keeps_path_and_stale_list() {
        let mut nav = CategoryNavigator::new();
        let root = nav.load_root();
        nav.complete(root.token, Ok(root_list()));

        let EnterOutcome::Fetch(request) = nav.enter_category(&category("165", "Apple", true))
        else {
            panic!("expected fetch");
        };
        nav.complete(
            request.token,
            Err(CatalogError::Api {
                status: 500,
                body: "boom".to_string(),
            }),
        );

        assert_eq!(nav.path().len(), 1);
        assert_eq!(nav.categories(), root_list().as_slice());
        assert!(!nav.is_loading());
        assert!(nav.error().unwrap().contains("500"));

        // retry targets the same breadcrumb and clears the error
        let retry = nav.retry();
        assert_eq!(retry.scope, CategoryScope::Children("165".to_string()));
        assert_eq!(nav.error(), None);
    }

    #[test]
    fn test_enter_from_stale_list_rebases_breadcrumb() {
        let mut nav = CategoryNavigator::new();
        let root = nav.load_root();
        nav.complete(
            root.token,
            Ok(vec![
                category("165", "Apple", true),
                category("170", "Samsung", true),
            ]),
        );

        let apple = nav.categories()[0].clone();
        let EnterOutcome::Fetch(request) = nav.enter_category(&apple) else {
            panic!("expected fetch");
        };
        nav.complete(
            request.token,
            Err(CatalogError::Network("connection refused".to_string())),
        );
        assert_eq!(nav.path().len(), 1);

        // the root list is still displayed, so Samsung is a root child
        let samsung = nav.categories()[1].clone();
        let EnterOutcome::Fetch(request) = nav.enter_category(&samsung) else {
            panic!("expected fetch");
        };
        assert_eq!(request.scope, CategoryScope::Children("170".to_string()));
        let ids: Vec<&str> = nav.path().iter().map(|crumb| crumb.id.as_str()).collect();
        assert_eq!(ids, vec!["170"]);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut nav = drilled_to_apple();
        let EnterOutcome::Fetch(slow) = nav.enter_category(&category("200", "iPhone", true)) else {
            panic!("expected fetch");
        };
        // picked from the Apple list that is still displayed
        let EnterOutcome::Fetch(fast) = nav.enter_category(&category("201", "iPad", true)) else {
            panic!("expected fetch");
        };
        let ipad_children = vec![category("400", "iPad Air", false)];

        assert!(nav.complete(fast.token, Ok(ipad_children.clone())));
        assert!(!nav.complete(slow.token, Ok(iphone_children())));
        assert_eq!(nav.categories(), ipad_children.as_slice());
        let ids: Vec<&str> = nav.path().iter().map(|crumb| crumb.id.as_str()).collect();
        assert_eq!(ids, vec!["165", "201"]);
    }

    #[tokio::test]
    async fn test_back_after_enter_restores_previous_view() {
        let source = FakeSource::catalog();
        let mut browser = CategoryBrowser::new(&source);
        browser.load_root().await;
        browser.enter(&category("165", "Apple", true)).await;

        let path_before = browser.navigator().path().to_vec();
        let list_before = browser.navigator().categories().to_vec();

        let redirect = browser.enter(&category("200", "iPhone", true)).await;
        assert_eq!(redirect, None);
        assert_eq!(browser.navigator().categories(), iphone_children().as_slice());

        browser.back().await;
        assert_eq!(browser.navigator().path(), path_before.as_slice());
        assert_eq!(browser.navigator().categories(), list_before.as_slice());
    }

    #[tokio::test]
    async fn test_browser_issues_expected_fetches() {
        let source = FakeSource::catalog();
        let mut browser = CategoryBrowser::new(&source);
        browser.load_root().await;
        browser.enter(&category("165", "Apple", true)).await;
        let redirect = browser.enter(&category("201", "iPad", false)).await;
        browser.root().await;

        assert_eq!(redirect, Some(Route::category_products("201")));
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec![
                CategoryScope::Root,
                CategoryScope::Children("165".to_string()),
                CategoryScope::Root,
            ]
        );
    }

    #[tokio::test]
    async fn test_browser_retry_recovers_after_failure() {
        let source = FakeSource::catalog();
        let mut browser = CategoryBrowser::new(&source);
        browser.load_root().await;

        source.fail_next(true);
        browser.enter(&category("165", "Apple", true)).await;
        assert!(browser.navigator().error().is_some());
        assert_eq!(browser.navigator().categories(), root_list().as_slice());

        source.fail_next(false);
        browser.retry().await;
        assert_eq!(browser.navigator().error(), None);
        assert_eq!(browser.navigator().categories(), apple_children().as_slice());
    }
}

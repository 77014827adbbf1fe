// src/search.rs
use crate::models::product::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Description,
    Category,
}

impl SearchField {
    pub fn column(self) -> &'static str {
        match self {
            SearchField::Name => "name",
            SearchField::Description => "description",
            SearchField::Category => "category",
        }
    }

    fn value(self, product: &Product) -> &str {
        match self {
            SearchField::Name => &product.name,
            SearchField::Description => &product.description,
            SearchField::Category => &product.category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Case-insensitive "contains".
    Substring,
    /// Case-insensitive equality.
    Exact,
}

/// Which product fields a search term is matched against, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPolicy {
    pub fields: Vec<SearchField>,
    pub mode: SearchMode,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            fields: vec![SearchField::Name, SearchField::Description],
            mode: SearchMode::Substring,
        }
    }
}

impl SearchPolicy {
    pub fn from_settings(fields: Option<&str>, mode: Option<&str>) -> Result<Self, String> {
        let mut policy = SearchPolicy::default();

        if let Some(raw) = fields {
            let mut parsed = Vec::new();
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let field = match part.to_ascii_lowercase().as_str() {
                    "name" => SearchField::Name,
                    "description" => SearchField::Description,
                    "category" => SearchField::Category,
                    other => return Err(format!("unknown search field {other:?}")),
                };
                if !parsed.contains(&field) {
                    parsed.push(field);
                }
            }
            if parsed.is_empty() {
                return Err("at least one search field is required".into());
            }
            policy.fields = parsed;
        }

        if let Some(raw) = mode {
            policy.mode = match raw.trim().to_ascii_lowercase().as_str() {
                "substring" => SearchMode::Substring,
                "exact" => SearchMode::Exact,
                other => return Err(format!("unknown search mode {other:?}")),
            };
        }

        Ok(policy)
    }

    /// Every term has to hit at least one of the searched fields.
    pub fn matches(&self, product: &Product, query: &SearchQuery) -> bool {
        query.terms.iter().all(|term| {
            self.fields.iter().any(|field| {
                let haystack = field.value(product).to_lowercase();
                match self.mode {
                    SearchMode::Substring => haystack.contains(term.as_str()),
                    SearchMode::Exact => haystack == *term,
                }
            })
        })
    }
}

/// A parsed search string: lower-cased, whitespace-separated terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub terms: Vec<String>,
}

impl SearchQuery {
    pub fn parse(raw: &str, mode: SearchMode) -> Self {
        let lowered = raw.trim().to_lowercase();
        let terms = match mode {
            SearchMode::Substring => lowered.split_whitespace().map(String::from).collect(),
            // exact matching compares the whole query against a field
            SearchMode::Exact if lowered.is_empty() => Vec::new(),
            SearchMode::Exact => vec![lowered],
        };
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Escape `%`, `_` and `\` so a term is matched literally by `ILIKE`.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

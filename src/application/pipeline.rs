//! Processing pipeline: roots → closure → field sort → render.

use std::io::Write;

use tracing::{debug, instrument};

use crate::application::output::{
    format_manifests, format_table, tree_headers, tree_table, FieldProvider, Manifest,
    OutputMode,
};
use crate::application::sort::{FieldComparator, SortSpec};
use crate::application::{ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{sort_hierarchy, Closure, Source, TreeSynthesizer, WorkerPool};

/// A [`Source`] that also knows how to turn user given specs into roots.
pub trait Catalog: Source {
    /// Elements named by `specs`. Unresolvable specs yield elements carrying
    /// an error instead of failing the run.
    fn roots(&self, specs: &[String], closure: bool) -> Vec<Self::Element>;

    /// Comparators for fields that should not sort as plain strings.
    fn comparators(&self) -> Vec<(&'static str, FieldComparator)> {
        Vec::new()
    }
}

pub struct Pipeline {
    settings: Settings,
    sort: SortSpec,
    pool: Option<WorkerPool>,
}

impl Pipeline {
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        let sort = SortSpec::parse(&settings.sort)?;
        let pool = (settings.parallel > 0).then(|| WorkerPool::new(settings.parallel));
        Ok(Self {
            settings,
            sort,
            pool,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the pipeline for `specs` and write the rendered result to `out`.
    ///
    /// Returns the number of rendered rows or manifest items.
    #[instrument(level = "debug", skip_all, fields(output = %self.settings.output, closure = self.settings.closure))]
    pub fn process<S, W>(&self, specs: &[String], source: &S, out: &mut W) -> ApplicationResult<usize>
    where
        S: Catalog,
        S::Element: FieldProvider + Manifest,
        W: Write,
    {
        let mode = self.settings.output;
        // manifests have no columns; sort by the wide view
        let field_mode = if mode.is_manifest() {
            OutputMode::Wide
        } else {
            mode
        };
        let sort = source
            .comparators()
            .into_iter()
            .fold(self.sort.clone(), |spec, (name, cmp)| spec.with_comparator(name, cmp));
        let sort = sort.resolve(&S::Element::field_names(field_mode))?;

        let roots = source.roots(specs, self.settings.closure);
        debug!("resolved {} roots", roots.len());
        let mut elements = if self.settings.closure {
            self.explore(source, roots)?
        } else {
            roots
        };
        sort.sort(&mut elements, field_mode);

        let (text, count) = match mode {
            OutputMode::Tree => {
                sort_hierarchy(&mut elements);
                let rows = TreeSynthesizer::with_symbol(&self.settings.node_symbol).synthesize(&elements);
                let data = tree_table(&rows);
                (format_table(&tree_headers::<S::Element>(), &data), data.len())
            }
            OutputMode::Table | OutputMode::Wide => {
                let data: Vec<Vec<String>> = elements.iter().map(|e| e.fields(mode)).collect();
                (format_table(&S::Element::field_names(mode), &data), data.len())
            }
            OutputMode::Json | OutputMode::Yaml => {
                let items: Vec<_> = elements.iter().map(Manifest::as_manifest).collect();
                let count = items.len();
                (format_manifests(mode, items)?, count)
            }
        };
        out.write_all(text.as_bytes()).with_context("write output")?;
        debug!(count, "rendered");
        Ok(count)
    }

    fn explore<S: Catalog>(&self, source: &S, roots: Vec<S::Element>) -> ApplicationResult<Vec<S::Element>> {
        let closure = Closure::new(source).with_mode(self.settings.output.closure_mode());
        let mut all = Vec::new();
        for root in roots {
            match &self.pool {
                Some(pool) => all.extend(closure.explore_parallel(root, pool)?),
                None => all.extend(closure.explore(root)),
            }
        }
        Ok(all)
    }

    /// Shut down the worker pool. Returns false if there is none or it was
    /// already closed.
    pub fn close(&self) -> bool {
        self.pool.as_ref().is_some_and(WorkerPool::close)
    }
}

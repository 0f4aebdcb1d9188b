use image::DynamicImage;
use std::sync::Arc;
use std::collections::HashMap;
use std::sync::mpsc::{self, Sender, Receiver};
use anyhow::Result;

/// Bounding box in the source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Data that flows through the pipeline
/// Each PipelineData represents a single image region with associated metadata
#[derive(Clone)]
pub struct PipelineData {
    /// The image data at the current stage (grayscale, binary, resized...)
    pub image: DynamicImage,

    /// Image that regions are cropped from (shared via Arc).
    /// Starts as the input and may be replaced by a normalising step.
    pub source: Arc<DynamicImage>,

    /// Bounding box in the source image (None means full image)
    pub bbox: Option<BoundingBox>,

    /// Per-item properties set by steps (e.g. "inverted", "digit", "confidence")
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Bool(bool),
    Float(f32),
    Int(i64),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let source = Arc::new(image.clone());
        Self {
            image,
            source,
            bbox: None,
            metadata: HashMap::new(),
        }
    }

    /// Create PipelineData for a region of an image
    pub fn from_region(
        image: DynamicImage,
        source: Arc<DynamicImage>,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            image,
            source,
            bbox: Some(bbox),
            metadata: HashMap::new(),
        }
    }

    /// Same region and metadata, new image
    pub fn with_image(&self, image: DynamicImage) -> Self {
        Self {
            image,
            source: self.source.clone(),
            bbox: self.bbox.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.metadata.get(key) {
            Some(MetadataValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: std::path::PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;
}

fn step_dir_name(step_index: usize, step_name: &str) -> String {
    format!("{:02}_{}", step_index, step_name.to_lowercase().replace(' ', "_"))
}

fn save_debug_image(image: &DynamicImage, dir: &std::path::Path, filename: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    image
        .save(dir.join(filename))
        .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))
}

/// Work item for pipeline execution
/// Contains data and the remaining steps to execute
#[derive(Clone)]
pub struct WorkItem {
    pub data: PipelineData,

    /// Steps not yet executed
    pub remaining_steps: Vec<Arc<dyn PipelineStep>>,

    pub current_step_index: usize,

    /// IDs from previous steps that led to this item
    /// E.g., [1, 3, 2] means: item 1 from step 0 → item 3 from step 1 → item 2 from step 2
    pub lineage: Vec<usize>,
}

impl WorkItem {
    pub fn new(data: PipelineData, steps: Vec<Arc<dyn PipelineStep>>) -> Self {
        Self {
            data,
            remaining_steps: steps,
            current_step_index: 0,
            lineage: vec![],
        }
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_steps.is_empty()
    }

    /// Generate filename from lineage (e.g., "01-03-02.png")
    pub fn lineage_filename(&self, extension: &str) -> String {
        if self.lineage.is_empty() {
            format!("01.{}", extension)
        } else {
            let ids: Vec<String> = self.lineage.iter().map(|id| format!("{:02}", id)).collect();
            format!("{}.{}", ids.join("-"), extension)
        }
    }

    fn save_debug_output(&self, context: &PipelineContext, step_name: &str) -> Result<()> {
        if let Some(debug_config) = &context.debug {
            let dir_name = step_dir_name(self.current_step_index, step_name);
            let filename = self.lineage_filename("png");
            save_debug_image(&self.data.image, &debug_config.output_dir.join(&dir_name), &filename)?;
            tracing::debug!("saved debug image {}/{}", dir_name, filename);
        }
        Ok(())
    }

    /// Run the next step and create work items for its outputs
    pub fn process_next_step(&self, context: &PipelineContext) -> Result<Vec<WorkItem>> {
        let Some((step, remaining_after)) = self.remaining_steps.split_first() else {
            return Ok(vec![]);
        };
        let step_name = step.name();

        // This may split 1 item into many, or drop it
        let results = step.process(vec![self.data.clone()], context)?;

        let mut new_items = Vec::with_capacity(results.len());
        for (idx, result_data) in results.into_iter().enumerate() {
            let mut new_lineage = self.lineage.clone();
            new_lineage.push(idx + 1); // 1-indexed for readability

            let new_item = WorkItem {
                data: result_data,
                remaining_steps: remaining_after.to_vec(),
                current_step_index: self.current_step_index + 1,
                lineage: new_lineage,
            };
            new_item.save_debug_output(context, step_name)?;
            new_items.push(new_item);
        }

        Ok(new_items)
    }
}

/// Pipeline executor using MPSC channel for work distribution.
/// Items are processed one at a time in FIFO order, so the relative
/// order of sibling outputs is preserved.
pub struct PipelineExecutor {
    sender: Sender<WorkItem>,
    receiver: Receiver<WorkItem>,
    context: PipelineContext,
}

impl PipelineExecutor {
    pub fn new(context: PipelineContext) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            context,
        }
    }

    /// Execute the pipeline by processing work items from the channel
    pub fn execute(&self, initial_items: Vec<WorkItem>) -> Result<Vec<PipelineData>> {
        let mut pending_count = 0usize;
        for item in initial_items {
            self.sender.send(item)
                .map_err(|e| anyhow::anyhow!("Failed to send work item: {}", e))?;
            pending_count += 1;
        }

        let mut completed_results = Vec::new();

        while pending_count > 0 {
            let item = self.receiver.try_recv()
                .map_err(|e| anyhow::anyhow!("Work queue drained early: {}", e))?;
            pending_count -= 1;

            if item.is_complete() {
                completed_results.push(item.data);
                continue;
            }

            for new_item in item.process_next_step(&self.context)? {
                self.sender.send(new_item)
                    .map_err(|e| anyhow::anyhow!("Failed to send work item: {}", e))?;
                pending_count += 1;
            }
        }

        Ok(completed_results)
    }
}

/// Composable pipeline builder
#[derive(Clone)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: std::path::PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    fn save_debug_input(&self, input: &DynamicImage) -> Result<()> {
        if let Some(debug_config) = &self.context.debug {
            save_debug_image(input, &debug_config.output_dir.join("00_input"), "01.png")?;
            tracing::debug!("saved debug image 00_input/01.png");
        }
        Ok(())
    }

    /// Run the pipeline step by step on an input image
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.save_debug_input(&input)?;

        let mut data = vec![PipelineData::from_image(input)];

        for (step_idx, step) in self.steps.iter().enumerate() {
            tracing::debug!("running step: {} (processing {} items)", step.name(), data.len());
            data = step.process(data, &self.context)?;

            if let Some(debug_config) = &self.context.debug {
                let dir = debug_config.output_dir.join(step_dir_name(step_idx + 1, step.name()));
                for (idx, item) in data.iter().enumerate() {
                    save_debug_image(&item.image, &dir, &format!("{:02}.png", idx + 1))?;
                }
            }

            tracing::debug!("  → {} items", data.len());
        }

        Ok(data)
    }

    /// Run the pipeline through the work-queue executor; debug images are
    /// named by lineage so each output can be traced back to its parents
    pub fn run_with_executor(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.save_debug_input(&input)?;

        let initial_item = WorkItem::new(PipelineData::from_image(input), self.steps.clone());
        let executor = PipelineExecutor::new(self.context.clone());
        executor.execute(vec![initial_item])
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

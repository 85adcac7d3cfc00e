mod persistence;
mod pipeline_retry;

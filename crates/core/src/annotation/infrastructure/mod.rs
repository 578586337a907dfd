pub mod opencv_box_annotator;

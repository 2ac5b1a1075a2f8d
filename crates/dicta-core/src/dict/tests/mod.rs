mod expandable;
